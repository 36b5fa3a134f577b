//! Joint-stereo reconstruction.
//!
//! Undoes the encoder-side sum/difference matrixing and channel weighting
//! between the two coupled channels. Selector and weight changes are
//! smoothed with an eight-sample linear ramp at the start of each band.

use crate::data::{BAND_SAMPLES, MATRIX_COEFFS, QMF_BANDS};
use crate::utils::fixed::{Q16, sqrt_q16};

/// Linear eight-step ramp between two Q16 factors; step 0 yields `from`,
/// step 8 would yield `to`.
#[inline]
fn interpolate(from: Q16, to: Q16, step: usize) -> Q16 {
    Q16(from.0 + ((step as i32 * (to.0 - from.0)) >> 3))
}

/// Undoes the per-band channel matrixing.
///
/// Each band applies the current selector's fixed matrix; when the selector
/// differs from the previous frame's, the first eight samples blend the two
/// coefficient pairs instead.
pub fn reverse_matrixing(
    ch0: &mut [i32],
    ch1: &mut [i32],
    prev_selectors: &[usize; QMF_BANDS],
    selectors: &[usize; QMF_BANDS],
) {
    for band in 0..QMF_BANDS {
        let base = band * BAND_SAMPLES;
        let s1 = prev_selectors[band];
        let s2 = selectors[band];
        let mut sample = 0;

        if s1 != s2 {
            let [old_l, old_r] = MATRIX_COEFFS[s1];
            let [new_l, new_r] = MATRIX_COEFFS[s2];

            while sample < 8 {
                let c1 = ch0[base + sample];
                let c2 = ch1[base + sample];
                let mixed = interpolate(old_l, new_l, sample).scale(c1)
                    + interpolate(old_r, new_r, sample).scale(c2);
                ch0[base + sample] = mixed;
                ch1[base + sample] = (c1 << 1) - mixed;
                sample += 1;
            }
        }

        match s2 {
            0 => {
                // mid/side, doubled
                for i in base + sample..base + BAND_SAMPLES {
                    let c1 = ch0[i];
                    let c2 = ch1[i];
                    ch0[i] = c2 << 1;
                    ch1[i] = (c1 - c2) << 1;
                }
            }
            1 => {
                for i in base + sample..base + BAND_SAMPLES {
                    let c1 = ch0[i];
                    let c2 = ch1[i];
                    ch0[i] = (c1 + c2) << 1;
                    ch1[i] = -(c2 << 1);
                }
            }
            _ => {
                // plain sum/difference
                for i in base + sample..base + BAND_SAMPLES {
                    let c1 = ch0[i];
                    let c2 = ch1[i];
                    ch0[i] = c1 + c2;
                    ch1[i] = c1 - c2;
                }
            }
        }
    }
}

/// Derives the two channel weights from a 3-bit index and polarity flag.
///
/// Index 7 means unity for both channels; otherwise one channel takes
/// `index / 7` and the other the complementary `sqrt(2 - w^2)`, swapped
/// when the polarity flag is set.
fn channel_weights(index: usize, swapped: bool) -> [Q16; 2] {
    if index == 7 {
        return [Q16::ONE; 2];
    }

    let w = Q16(((index as i32) << 16) / 7);
    let complement = sqrt_q16(Q16((2 << 16) - w.mul(w).0));

    if swapped { [complement, w] } else { [w, complement] }
}

/// Applies per-band channel weighting to bands 1-3.
///
/// `delay` holds three weight generations as (flag, index) pairs, oldest
/// first; the newest pair was read from the current frame and takes effect
/// one frame later.
pub fn channel_weighting(ch0: &mut [i32], ch1: &mut [i32], delay: &[usize; 6]) {
    if delay[1] == 7 && delay[3] == 7 {
        return;
    }

    let prev = channel_weights(delay[1], delay[0] != 0);
    let cur = channel_weights(delay[3], delay[2] != 0);

    for band in 1..QMF_BANDS {
        let base = band * BAND_SAMPLES;

        for step in 0..8 {
            ch0[base + step] = interpolate(prev[0], prev[1], step).scale(ch0[base + step]);
            ch1[base + step] = interpolate(cur[0], cur[1], step).scale(ch1[base + step]);
        }
        for i in base + 8..base + BAND_SAMPLES {
            ch0[i] = cur[0].scale(ch0[i]);
            ch1[i] = cur[1].scale(ch1[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands(value0: i32, value1: i32) -> (Vec<i32>, Vec<i32>) {
        (vec![value0; 1024], vec![value1; 1024])
    }

    #[test]
    fn constant_selector_three_is_plain_sum_difference() {
        let (mut ch0, mut ch1) = bands(300, 100);
        reverse_matrixing(&mut ch0, &mut ch1, &[3; 4], &[3; 4]);

        assert!(ch0.iter().all(|&s| s == 400));
        assert!(ch1.iter().all(|&s| s == 200));
    }

    #[test]
    fn constant_selector_two_matches_selector_three() {
        let (mut a0, mut a1) = bands(300, 100);
        reverse_matrixing(&mut a0, &mut a1, &[2; 4], &[2; 4]);

        let (mut b0, mut b1) = bands(300, 100);
        reverse_matrixing(&mut b0, &mut b1, &[3; 4], &[3; 4]);

        assert_eq!(a0, b0);
        assert_eq!(a1, b1);
    }

    #[test]
    fn constant_selector_zero_is_doubled_mid_side() {
        let (mut ch0, mut ch1) = bands(300, 100);
        reverse_matrixing(&mut ch0, &mut ch1, &[0; 4], &[0; 4]);

        assert!(ch0.iter().all(|&s| s == 200));
        assert!(ch1.iter().all(|&s| s == 400));
    }

    #[test]
    fn constant_selector_one_negates_the_side() {
        let (mut ch0, mut ch1) = bands(300, 100);
        reverse_matrixing(&mut ch0, &mut ch1, &[1; 4], &[1; 4]);

        assert!(ch0.iter().all(|&s| s == 800));
        assert!(ch1.iter().all(|&s| s == -200));
    }

    #[test]
    fn selector_change_ramps_from_the_old_matrix() {
        let (mut ch0, mut ch1) = bands(300, 100);
        reverse_matrixing(&mut ch0, &mut ch1, &[0; 4], &[3; 4]);

        // Sample 0 is exactly the old (mid/side) matrix...
        assert_eq!(ch0[0], 200);
        assert_eq!(ch1[0], 400);
        // ...and the ramp has converged to the new matrix by sample 8.
        assert_eq!(ch0[8], 400);
        assert_eq!(ch1[8], 200);
    }

    #[test]
    fn interpolation_endpoints_are_exact() {
        let from = Q16(11 << 14);
        let to = Q16(-3 << 14);
        assert_eq!(interpolate(from, to, 0), from);
        assert_eq!(interpolate(from, to, 8), to);
    }

    #[test]
    fn unity_weights_leave_channels_alone() {
        let (mut ch0, mut ch1) = bands(12345, -999);
        let (want0, want1) = (ch0.clone(), ch1.clone());

        channel_weighting(&mut ch0, &mut ch1, &[0, 7, 0, 7, 0, 7]);
        assert_eq!(ch0, want0);
        assert_eq!(ch1, want1);
    }

    #[test]
    fn weighting_scales_upper_bands_only() {
        let (mut ch0, mut ch1) = bands(1 << 12, 1 << 12);
        // Current generation: index 0 with no swap, so channel 0 is muted
        // and channel 1 takes sqrt(2).
        channel_weighting(&mut ch0, &mut ch1, &[0, 7, 0, 0, 0, 0]);

        // Band 0 is never weighted.
        assert!(ch0[..256].iter().all(|&s| s == 1 << 12));
        assert!(ch1[..256].iter().all(|&s| s == 1 << 12));

        // Past the ramp, channel 0 carries weight 0 and channel 1 sqrt(2).
        assert!(ch0[264..512].iter().all(|&s| s == 0));
        let sqrt2 = sqrt_q16(Q16(2 << 16));
        let want = sqrt2.scale(1 << 12);
        assert!(ch1[264..512].iter().all(|&s| s == want));
    }
}
