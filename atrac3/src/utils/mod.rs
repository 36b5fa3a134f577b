//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream I/O, Huffman decoding, fixed-point arithmetic,
//! frame descrambling and error handling for the decode stages.

pub mod bitstream_io;
pub mod descramble;
pub mod errors;
pub mod fixed;
