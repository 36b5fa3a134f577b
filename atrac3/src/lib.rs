#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! ### Frame Organization
//!
//! Every frame carries one sound unit per channel. In joint-stereo mode
//! the second unit is stored in reverse byte order behind sync fill, and
//! the two decoded channels are rebuilt through interpolated matrix
//! switching and channel weighting.
//!
//! ### Decode Pipeline
//!
//! 1. Optional transport descrambling ([`utils::descramble`])
//! 2. Gain envelopes, tonal overlay and band spectrum per sound unit
//!    ([`structs`])
//! 3. Per-band inverse transform with gain-compensated overlap-add
//!    ([`dsp::imdct`], [`structs::gain`])
//! 4. Three-stage QMF synthesis with persistent delay lines ([`dsp::qmf`])
//!
//! ### Ordering
//!
//! Overlap tails, gain generations and filter delay lines all carry state
//! from the immediately preceding frame; frames must be decoded in stream
//! order, one at a time per decoder instance.

/// Frame decoding.
///
/// Provides the [`Decoder`](process::decode::Decoder) turning compressed
/// frames into [`DecodedFrame`](process::decode::DecodedFrame) PCM blocks.
pub mod process;

/// Bitstream syntax structures and decoder state.
///
/// - **Stream configuration** ([`structs::config`]): out-of-band codec
///   parameters and their validation
/// - **Channel state** ([`structs::channel`]): cross-frame channel units
/// - **Spectrum** ([`structs::spectrum`]): subband mantissa decoding
/// - **Tonal components** ([`structs::tonal`]): sparse overlay decoding
/// - **Gain control** ([`structs::gain`]): envelope decode and application
pub mod structs;

/// Fixed-point signal processing.
///
/// - **Inverse transform** ([`dsp::imdct`])
/// - **QMF synthesis** ([`dsp::qmf`])
/// - **Joint-stereo reconstruction** ([`dsp::stereo`])
pub mod dsp;

/// Constant tables and the shared, lazily built table set.
pub mod data;

/// Supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): bit reader and codebooks
/// - **Descrambling** ([`utils::descramble`]): transport XOR removal
/// - **Fixed point** ([`utils::fixed`]): Q16/Q31 arithmetic
/// - **Error handling** ([`utils::errors`]): error types
pub mod utils;
