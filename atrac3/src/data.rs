//! Constant data for the decode stages.
//!
//! The value tables (codebooks, subband layout, reconstruction levels,
//! filter prototype) are fixed by the format. Tables whose entries are
//! irrational in closed form are generated once on first use into
//! fixed-point storage and shared read-only across every decoder instance;
//! nothing here is touched mutably on the decode path.

use std::f64::consts::PI;
use std::sync::OnceLock;

use crate::utils::bitstream_io::Codebook;
use crate::utils::fixed::{Q16, Q31};

/// Spectral lines per channel and frame.
pub const SAMPLES_PER_CHANNEL: usize = 1024;

/// Largest frame the internal buffers accept.
pub const MAX_FRAME_BYTES: usize = 1024;

/// QMF band count; each band covers 256 spectral lines.
pub const QMF_BANDS: usize = 4;

/// Samples per QMF band segment.
pub const BAND_SAMPLES: usize = 256;

/// Hard bound on tonal components per channel and frame.
pub const MAX_TONAL_COMPONENTS: usize = 64;

/// Repeating four-byte transport scrambling mask.
pub const SCRAMBLE_KEY: [u8; 4] = [0x53, 0x7F, 0x61, 0x03];

/// Six-bit identifier opening every independently coded sound unit.
pub const SOUND_UNIT_ID: u32 = 0x28;

/// Two-bit identifier of the second unit in a joint-stereo pair.
pub const SOUND_UNIT_ID_JOINT: u32 = 0x3;

/// Fill byte padding the reversed second sound unit.
pub const SYNC_FILL: u8 = 0xF8;

/// Spectral line offsets of the 32 subbands, plus the closing fence post.
#[rustfmt::skip]
pub const SUBBAND_OFFSETS: [usize; 33] = [
      0,   8,  16,  24,  32,  40,  48,  56,  64,  80,  96, 112, 128, 144, 160, 176,
    192, 224, 256, 288, 320, 352, 384, 416, 448, 480, 512, 576, 640, 704, 768, 896,
    1024,
];

/// Fixed-length mantissa bit widths per quantization selector.
pub const CLC_LENGTHS: [u32; 8] = [0, 4, 3, 3, 4, 4, 5, 6];

/// Mantissa pair values packed into one 4-bit fixed-length code.
pub const CLC_PAIR_VALUES: [i32; 4] = [0, 1, -2, -1];

/// Mantissa pairs of the paired-symbol codebook (selector 1).
#[rustfmt::skip]
pub const VLC_PAIR_VALUES: [[i32; 2]; 9] = [
    [ 0,  0],
    [ 0,  1],
    [ 0, -1],
    [ 1,  0],
    [-1,  0],
    [ 1,  1],
    [ 1, -1],
    [-1,  1],
    [-1, -1],
];

/// Canonical codes of the seven spectral codebooks, one per selector 1..=7.
pub const HUFFMAN_CODES: [&[u8]; 7] = [
    &[0x00, 0x04, 0x05, 0x0C, 0x0D, 0x1C, 0x1D, 0x1E, 0x1F],
    &[0x00, 0x04, 0x05, 0x06, 0x07],
    &[0x00, 0x04, 0x05, 0x0C, 0x0D, 0x0E, 0x0F],
    &[0x00, 0x04, 0x05, 0x0C, 0x0D, 0x1C, 0x1D, 0x1E, 0x1F],
    &[
        0x00, 0x02, 0x03, 0x08, 0x09, 0x0A, 0x0B, 0x1C, 0x1D, 0x3C, 0x3D, 0x3E, 0x3F, 0x0C, 0x0D,
    ],
    &[
        0x00, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x34, 0x35,
        0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x78, 0x79, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F, 0x08,
        0x09,
    ],
    &[
        0x00, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x24, 0x25, 0x26, 0x27,
        0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, 0x30, 0x31, 0x32, 0x33, 0x68, 0x69, 0x6A,
        0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0xEC, 0xED, 0xEE, 0xEF,
        0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE,
        0xFF, 0x02, 0x03,
    ],
];

/// Code lengths matching [`HUFFMAN_CODES`].
pub const HUFFMAN_LENGTHS: [&[u8]; 7] = [
    &[1, 3, 3, 4, 4, 5, 5, 5, 5],
    &[1, 3, 3, 3, 3],
    &[1, 3, 3, 4, 4, 4, 4],
    &[1, 3, 3, 4, 4, 5, 5, 5, 5],
    &[2, 3, 3, 4, 4, 4, 4, 5, 5, 6, 6, 6, 6, 4, 4],
    &[
        3, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7, 7, 7, 7, 7, 4,
        4,
    ],
    &[
        3, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7,
        7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
        8, 4, 4,
    ],
];

/// Gain compensation levels, 2^(4 - level) in Q16.
#[rustfmt::skip]
pub const GAIN_LEVELS: [Q16; 16] = [
    Q16(1 << 20), Q16(1 << 19), Q16(1 << 18), Q16(1 << 17),
    Q16(1 << 16), Q16(1 << 15), Q16(1 << 14), Q16(1 << 13),
    Q16(1 << 12), Q16(1 << 11), Q16(1 << 10), Q16(1 << 9),
    Q16(1 << 8),  Q16(1 << 7),  Q16(1 << 6),  Q16(1 << 5),
];

/// Stereo matrix coefficient pairs per selector, Q16.
pub const MATRIX_COEFFS: [[Q16; 2]; 4] = [
    [Q16(0), Q16(2 << 16)],
    [Q16(2 << 16), Q16(2 << 16)],
    [Q16(0), Q16(0)],
    [Q16(1 << 16), Q16(1 << 16)],
];

/// First half of the symmetric 48-tap QMF prototype window.
#[rustfmt::skip]
const QMF_WINDOW_HALF: [f64; 24] = [
    -0.000_029_238_139, -0.000_184_109_580, -0.000_112_315_138,  0.000_602_345_390,
     0.000_484_503_806, -0.001_705_877_949, -0.001_041_114_796,  0.004_068_033_770,
     0.001_566_677_820, -0.008_430_772_461, -0.001_512_299_757,  0.015_680_588_782,
    -0.000_122_339_843, -0.026_883_240_789,  0.004_925_364_163,  0.043_472_178_280,
    -0.015_603_342_094, -0.068_180_441_856,  0.037_618_979_812,  0.108_652_018_011,
    -0.087_192_758_918, -0.198_768_734_932,  0.264_158_189_297,  0.928_483_188_152,
];

/// Scale factors are stored shifted down [`SF_SHIFT_DOWN`] bits so the
/// largest entry (2^16) fits Q31; inverse quantization compensates.
pub const SF_SHIFT_DOWN: u32 = 17;

/// Read-only table set shared by every open decoder instance.
pub struct CodecTables {
    /// Spectral codebooks keyed by selector - 1.
    pub codebooks: [Codebook; 7],
    /// Scale factors 2^((i - 15) / 3), shifted down per [`SF_SHIFT_DOWN`].
    pub scale_factors: [Q31; 64],
    /// Per-selector quantization step scales 1 / max_quant.
    pub quant_scales: [Q31; 8],
    /// Gain ramp multipliers 2^((15 - i) / 8) in Q16.
    pub gain_ramps: [Q16; 32],
    /// One full period of the transform cosine lattice.
    pub imdct_cos: [Q31; 2048],
    /// Leading half of the asymmetric transform window.
    pub imdct_window: [Q31; 128],
    /// Expanded 48-tap QMF synthesis window.
    pub qmf_window: [Q31; 48],
}

/// Returns the shared table set, building it on first use.
pub fn codec_tables() -> &'static CodecTables {
    static TABLES: OnceLock<CodecTables> = OnceLock::new();
    TABLES.get_or_init(CodecTables::build)
}

impl CodecTables {
    fn build() -> Self {
        let codebooks =
            std::array::from_fn(|i| Codebook::from_codes(HUFFMAN_CODES[i], HUFFMAN_LENGTHS[i]));

        let mut scale_factors = [Q31(0); 64];
        for (i, sf) in scale_factors.iter_mut().enumerate() {
            let value = 2f64.powf((i as f64 - 15.0) / 3.0);
            *sf = Q31::from_f64(value / (1u64 << SF_SHIFT_DOWN) as f64);
        }

        let mut quant_scales = [Q31(0); 8];
        let max_quant = [0.0, 1.5, 2.5, 3.5, 4.5, 7.5, 15.5, 31.5];
        for (qs, &max) in quant_scales.iter_mut().zip(&max_quant).skip(1) {
            *qs = Q31::from_f64(1.0 / max);
        }

        let mut gain_ramps = [Q16(0); 32];
        for (i, ramp) in gain_ramps.iter_mut().enumerate() {
            *ramp = Q16::from_f64(2f64.powf((15.0 - i as f64) / 8.0));
        }

        let mut imdct_cos = [Q31(0); 2048];
        for (j, cos) in imdct_cos.iter_mut().enumerate() {
            *cos = Q31::from_f64((2.0 * PI * j as f64 / 2048.0).cos());
        }

        // The analysis window w satisfies w[i]^2 + w[255 - i]^2 = 1 over the
        // overlap region; the synthesis window divides it back out.
        let mut half = [0f64; 256];
        for (i, h) in half.iter_mut().enumerate() {
            *h = (((i as f64 + 0.5) / 256.0 - 0.5) * PI).sin() * 0.5 + 0.5;
        }
        let mut imdct_window = [Q31(0); 128];
        for (i, win) in imdct_window.iter_mut().enumerate() {
            *win = Q31::from_f64(half[i] / (half[i] * half[i] + half[255 - i] * half[255 - i]));
        }

        let mut qmf_window = [Q31(0); 48];
        for (i, &tap) in QMF_WINDOW_HALF.iter().enumerate() {
            let fixed = Q31::from_f64(tap);
            qmf_window[i] = fixed;
            qmf_window[47 - i] = fixed;
        }

        Self {
            codebooks,
            scale_factors,
            quant_scales,
            gain_ramps,
            imdct_cos,
            imdct_window,
            qmf_window,
        }
    }
}
