//! Fixed-point signal processing stages.
//!
//! - **Inverse transform** ([`imdct`]): per-band spectral to time domain
//! - **Filter bank** ([`qmf`]): three-stage quadrature-mirror synthesis
//! - **Stereo reconstruction** ([`stereo`]): joint-stereo matrixing and
//!   channel weighting

pub mod imdct;
pub mod qmf;
pub mod stereo;
