//! Gain envelope decode and gain compensation.
//!
//! Each band segment carries a piecewise gain envelope of up to eight
//! breakpoints. Compensation spans two frames: the previous frame's
//! envelope shapes the ramps while the current frame's first level scales
//! the fresh transform output, which is why two envelope generations are
//! kept ping-pong per channel.

use anyhow::{Result, bail};

use crate::data::{self, BAND_SAMPLES, GAIN_LEVELS, QMF_BANDS};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::FrameError;
use crate::utils::fixed::Q16;

pub const MAX_GAIN_POINTS: usize = 8;

/// Span end implied after the last breakpoint: unity level at sample 256.
const SENTINEL_LEVEL: usize = 4;

/// Piecewise gain envelope for one 256-sample band segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainEnvelope {
    pub num_points: usize,
    pub level: [usize; MAX_GAIN_POINTS],
    pub location: [usize; MAX_GAIN_POINTS],
}

/// One frame generation of envelopes for the four QMF bands.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainBlock {
    pub envelope: [GainEnvelope; QMF_BANDS],
}

impl GainBlock {
    /// Reads envelopes for the coded bands and clears the trailing ones.
    ///
    /// Breakpoint locations must strictly increase within an envelope; a
    /// violation is a malformed stream.
    pub fn read(&mut self, reader: &mut BsIoSliceReader, bands_coded: usize) -> Result<()> {
        for band in 0..=bands_coded {
            let envelope = &mut self.envelope[band];
            envelope.num_points = reader.get_n::<u32>(3)? as usize;

            for point in 0..envelope.num_points {
                envelope.level[point] = reader.get_n::<u32>(4)? as usize;
                envelope.location[point] = reader.get_n::<u32>(5)? as usize;

                if point > 0 && envelope.location[point] <= envelope.location[point - 1] {
                    bail!(FrameError::GainLocationOrder {
                        band,
                        prev: envelope.location[point - 1],
                        next: envelope.location[point],
                    });
                }
            }
        }

        for band in bands_coded + 1..QMF_BANDS {
            self.envelope[band].num_points = 0;
        }

        Ok(())
    }
}

/// Applies gain compensation to one transformed band segment and folds in
/// the previous frame's overlap tail.
///
/// `previous` is the envelope decoded for this band one frame ago;
/// `current` is this frame's envelope, whose first level scales the fresh
/// transform output. Each breakpoint span opens with an eight-sample
/// multiplicative ramp toward the following level, with unity implied past
/// the last breakpoint. The trailing 256 samples of `input` become the
/// band's next overlap tail.
pub fn compensate_and_overlap(
    input: &[i32],
    overlap: &mut [i32],
    out: &mut [i32],
    previous: &GainEnvelope,
    current: &GainEnvelope,
) {
    debug_assert_eq!(input.len(), 2 * BAND_SAMPLES);
    debug_assert_eq!(overlap.len(), BAND_SAMPLES);
    debug_assert_eq!(out.len(), BAND_SAMPLES);

    let gain1 = if current.num_points == 0 {
        Q16::ONE
    } else {
        GAIN_LEVELS[current.level[0]]
    };

    if previous.num_points == 0 {
        for ((out, &fresh), &tail) in out.iter_mut().zip(input).zip(overlap.iter()) {
            *out = gain1.scale(fresh) + tail;
        }
    } else {
        let tables = data::codec_tables();
        let mut sample = 0;

        for point in 0..previous.num_points {
            let start = previous.location[point] * 8;
            let end = start + 8;

            let level = previous.level[point];
            let next_level = if point + 1 < previous.num_points {
                previous.level[point + 1]
            } else {
                SENTINEL_LEVEL
            };

            let mut gain2 = GAIN_LEVELS[level];
            let ramp = tables.gain_ramps[next_level + 15 - level];

            while sample < start {
                out[sample] = gain2.scale(gain1.scale(input[sample]) + overlap[sample]);
                sample += 1;
            }
            while sample < end {
                out[sample] = gain2.scale(gain1.scale(input[sample]) + overlap[sample]);
                gain2 = gain2.mul(ramp);
                sample += 1;
            }
        }

        for i in sample..BAND_SAMPLES {
            out[i] = gain1.scale(input[i]) + overlap[i];
        }
    }

    overlap.copy_from_slice(&input[BAND_SAMPLES..]);
}
