//! Per-channel persistent decode state.

use crate::data::{MAX_TONAL_COMPONENTS, SAMPLES_PER_CHANNEL};
use crate::dsp::qmf::DELAY_LEN;
use crate::structs::gain::GainBlock;
use crate::structs::tonal::TonalComponent;

/// Everything one channel carries across frames.
///
/// Owned by the decoder for the stream's lifetime and mutated every frame;
/// the overlap tails, gain generations and filter delay lines are what make
/// strict frame ordering a hard requirement.
#[derive(Debug, Clone)]
pub struct ChannelUnit {
    /// Count of coded QMF bands for the current frame (0-3).
    pub bands_coded: usize,

    pub num_components: usize,
    pub components: [TonalComponent; MAX_TONAL_COMPONENTS],

    /// Inverse-quantized spectrum of the current frame.
    pub spectrum: [i32; SAMPLES_PER_CHANNEL],
    /// Transform scratch, one band at a time.
    pub imdct_buf: [i32; SAMPLES_PER_CHANNEL],
    /// Previous frame's pre-gain transform tails, 256 per band.
    pub prev_frame: [i32; SAMPLES_PER_CHANNEL],

    /// Ping-pong gain envelope generations; exactly one is current at any
    /// time and `gain_switch` selects it. They swap when a sound unit
    /// finishes decoding.
    pub gain_block: [GainBlock; 2],
    pub gain_switch: usize,

    /// One delay line per QMF synthesis stage.
    pub delay: [[i32; DELAY_LEN]; 3],
}

impl Default for ChannelUnit {
    fn default() -> Self {
        Self {
            bands_coded: 0,
            num_components: 0,
            components: [TonalComponent::default(); MAX_TONAL_COMPONENTS],
            spectrum: [0; SAMPLES_PER_CHANNEL],
            imdct_buf: [0; SAMPLES_PER_CHANNEL],
            prev_frame: [0; SAMPLES_PER_CHANNEL],
            gain_block: [GainBlock::default(); 2],
            gain_switch: 0,
            delay: [[0; DELAY_LEN]; 3],
        }
    }
}
