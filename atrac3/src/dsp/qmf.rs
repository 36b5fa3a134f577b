//! Quadrature-mirror synthesis filter bank.
//!
//! Three stages rebuild the full-band signal: bands 0+1 into the low 512
//! samples, bands 3+2 into the high 512, then the two halves into the final
//! 1024. Every stage owns a persistent 46-sample delay line per channel
//! that is prepended before dewindowing and refilled from the matrixed
//! buffer's tail.

use crate::data;
use crate::utils::fixed::Q31;

/// Words carried between consecutive calls of one stage and channel.
pub const DELAY_LEN: usize = 46;

/// Taps of the symmetric synthesis prototype.
pub const TAPS: usize = 48;

/// Matrixing and dewindowing kernel behind the synthesis stages.
///
/// Models the per-architecture fast paths of the original decoder. Every
/// implementation must match [`PortableKernel`] bit for bit; the portable
/// kernel is the reference the others are validated against.
pub trait QmfKernel: Send + Sync {
    /// Interleaves sum/difference pairs of the two half-spectra.
    fn matrix(&self, dst: &mut [i32], lo: &[i32], hi: &[i32]);

    /// Symmetric 48-tap convolution producing two output samples per input
    /// pair, with truncating Q31 multiplies.
    fn dewindow(&self, dst: &mut [i32], src: &[i32], window: &[Q31; TAPS]);
}

/// Reference kernel used on every target.
#[derive(Debug, Default)]
pub struct PortableKernel;

impl QmfKernel for PortableKernel {
    fn matrix(&self, dst: &mut [i32], lo: &[i32], hi: &[i32]) {
        debug_assert_eq!(dst.len(), lo.len() + hi.len());

        for ((pair, &low), &high) in dst.chunks_exact_mut(2).zip(lo).zip(hi) {
            pair[0] = low + high;
            pair[1] = low - high;
        }
    }

    fn dewindow(&self, dst: &mut [i32], src: &[i32], window: &[Q31; TAPS]) {
        debug_assert_eq!(src.len(), dst.len() + DELAY_LEN);

        for (j, out) in dst.chunks_exact_mut(2).enumerate() {
            let input = &src[2 * j..2 * j + TAPS];

            let mut s1 = 0i32;
            let mut s2 = 0i32;
            for i in (0..TAPS).step_by(2) {
                s1 += window[i].scale(input[i]);
                s2 += window[i + 1].scale(input[i + 1]);
            }

            out[0] = s2;
            out[1] = s1;
        }
    }
}

/// Runs one synthesis stage in place over the channel sample buffer.
///
/// `lo`, `hi` and `out` are offsets into `samples`; the stage reads `n`
/// samples from each input half and writes `2 * n` output samples. `temp`
/// holds the delay line followed by the matrixed pairs.
#[allow(clippy::too_many_arguments)]
pub fn synthesize(
    kernel: &dyn QmfKernel,
    samples: &mut [i32],
    lo: usize,
    hi: usize,
    out: usize,
    n: usize,
    delay: &mut [i32; DELAY_LEN],
    temp: &mut [i32],
) {
    let tables = data::codec_tables();

    temp[..DELAY_LEN].copy_from_slice(delay);

    {
        let (_, matrixed) = temp.split_at_mut(DELAY_LEN);
        kernel.matrix(
            &mut matrixed[..2 * n],
            &samples[lo..lo + n],
            &samples[hi..hi + n],
        );
    }

    kernel.dewindow(
        &mut samples[out..out + 2 * n],
        &temp[..2 * n + DELAY_LEN],
        &tables.qmf_window,
    );

    delay.copy_from_slice(&temp[2 * n..2 * n + DELAY_LEN]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrixing_interleaves_sum_and_difference() {
        let kernel = PortableKernel;
        let lo = [10i32, 20, 30, 40];
        let hi = [1i32, 2, 3, 4];
        let mut dst = [0i32; 8];

        kernel.matrix(&mut dst, &lo, &hi);
        assert_eq!(dst, [11, 9, 22, 18, 33, 27, 44, 36]);
    }

    #[test]
    fn delay_line_carries_the_matrixed_tail() {
        let kernel = PortableKernel;
        let mut samples = [0i32; 512];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = i as i32;
        }
        let mut delay = [0i32; DELAY_LEN];
        let mut temp = [0i32; DELAY_LEN + 1024];

        synthesize(&kernel, &mut samples, 0, 256, 0, 256, &mut delay, &mut temp);

        // The new delay line is exactly the trailing 46 matrixed words.
        let mut expected = [0i32; DELAY_LEN];
        for (slot, j) in expected.iter_mut().zip(466..512) {
            let (low, high) = (j / 2, 256 + j / 2);
            *slot = if j % 2 == 0 {
                low as i32 + high as i32
            } else {
                low as i32 - high as i32
            };
        }
        assert_eq!(delay, expected);
    }

    #[test]
    fn stored_tail_rings_into_a_silent_call() {
        let kernel = PortableKernel;
        let mut delay = [0i32; DELAY_LEN];
        let mut temp = [0i32; DELAY_LEN + 1024];

        // A loud stage call leaves energy in the delay line...
        let mut samples = [1 << 12; 512];
        synthesize(&kernel, &mut samples, 0, 256, 0, 256, &mut delay, &mut temp);
        assert!(delay.iter().any(|&s| s != 0));

        // ...which a silent follow-up drains through the window instead of
        // cutting to zero.
        let mut silent = [0i32; 512];
        synthesize(&kernel, &mut silent, 0, 256, 0, 256, &mut delay, &mut temp);
        assert!(silent[..DELAY_LEN].iter().any(|&s| s != 0));
        assert!(silent[DELAY_LEN..].iter().all(|&s| s == 0));
        assert!(delay.iter().all(|&s| s == 0));
    }
}
