//! Frame decoding.
//!
//! Provides the [`Decoder`](decode::Decoder) that turns fixed-size
//! compressed frames into [`DecodedFrame`](decode::DecodedFrame) blocks of
//! fixed-point PCM.

pub mod decode;
