//! Fixed-point inverse transform and windowing.

use crate::data::{self, BAND_SAMPLES, CodecTables};

/// 512-point inverse transform of one 256-line band, without overlap:
/// `x[t] = sum_k X[k] * cos(2*pi * (2t + 257)(2k + 1) / 2048)`, evaluated
/// against the shared Q31 cosine lattice with 64-bit accumulation.
fn imdct512(tables: &CodecTables, input: &[i32], output: &mut [i32]) {
    debug_assert_eq!(input.len(), 256);
    debug_assert_eq!(output.len(), 512);

    for (t, out) in output.iter_mut().enumerate() {
        let phase = 2 * t + 257;
        let mut acc = 0i64;
        for (k, &line) in input.iter().enumerate() {
            let cos = tables.imdct_cos[(phase * (2 * k + 1)) & 2047];
            acc += line as i64 * cos.0 as i64;
        }
        *out = (acc >> 31).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    }
}

/// Transforms one band segment to the time domain.
///
/// Odd bands arrive spectrally mirrored by the analysis filter bank and are
/// reversed pairwise first. The asymmetric window scales the 128
/// overlapping samples at each edge; the middle 256 pass through.
pub fn imlt(input: &mut [i32], output: &mut [i32], odd_band: bool) {
    let tables = data::codec_tables();

    if odd_band {
        for i in 0..BAND_SAMPLES / 2 {
            input.swap(i, BAND_SAMPLES - 1 - i);
        }
    }

    imdct512(tables, input, output);

    for i in 0..128 {
        output[i] = tables.imdct_window[i].scale(output[i]);
        output[511 - i] = tables.imdct_window[i].scale(output[511 - i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_in_silence_out() {
        let mut input = [0i32; 256];
        let mut output = [0i32; 512];

        imlt(&mut input, &mut output, false);
        assert!(output.iter().all(|&s| s == 0));

        imlt(&mut input, &mut output, true);
        assert!(output.iter().all(|&s| s == 0));
    }

    #[test]
    fn single_line_produces_a_bounded_wave() {
        let mut input = [0i32; 256];
        input[12] = 1 << 16;
        let mut output = [0i32; 512];

        imlt(&mut input, &mut output, false);

        assert!(output.iter().any(|&s| s != 0));
        // A single unit-amplitude line stays a unit-amplitude wave.
        assert!(output.iter().all(|&s| s.unsigned_abs() <= 1 << 16));
    }

    #[test]
    fn odd_band_reversal_is_pairwise() {
        let mut a: [i32; 256] = std::array::from_fn(|i| i as i32);
        let mut b = a;

        let mut out = [0i32; 512];
        imlt(&mut a, &mut out, false);
        imlt(&mut b, &mut out, true);

        // The reversal mutates the input in place.
        for i in 0..256 {
            assert_eq!(b[i], (255 - i) as i32);
        }
    }

    #[test]
    fn transform_is_linear_in_the_input() {
        let mut input = [0i32; 256];
        input[5] = 1000;
        input[9] = -500;
        let mut out1 = [0i32; 512];
        imlt(&mut input.clone(), &mut out1, false);

        let mut doubled = input.map(|v| v * 2);
        let mut out2 = [0i32; 512];
        imlt(&mut doubled, &mut out2, false);

        // Truncation makes doubling inexact by at most a couple of counts.
        for (&a, &b) in out1.iter().zip(&out2) {
            assert!((b - 2 * a).abs() <= 4, "{b} vs {}", 2 * a);
        }
    }
}
