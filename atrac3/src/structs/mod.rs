//! Data structures for the bitstream syntax and decoder state.
//!
//! - **Stream configuration** ([`config`]): out-of-band codec parameters
//! - **Channel state** ([`channel`]): per-channel cross-frame state
//! - **Band spectrum** ([`spectrum`]): subband mantissa decoding
//! - **Tonal overlay** ([`tonal`]): sparse narrow-band components
//! - **Gain envelopes** ([`gain`]): piecewise gain decode and compensation

pub mod channel;
pub mod config;
pub mod gain;
pub mod spectrum;
pub mod tonal;
