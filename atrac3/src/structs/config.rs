//! Stream configuration from the codec-specific extradata block.
//!
//! Containers hand the decoder a 10-byte (scrambled transport) or 14-byte
//! (plain transport) configuration block before the first frame. Every
//! field outside the expected set fails the stream open; an open stream
//! never revalidates its configuration.

use anyhow::{Result, anyhow, bail};
use log::Level::Warn;
use log::info;

use crate::data::MAX_FRAME_BYTES;
use crate::log_or_err;
use crate::utils::errors::ConfigError;

/// The only stream version this decoder understands.
pub const STREAM_VERSION: u32 = 4;

/// Fixed encoder delay carried by the scrambled-transport layout.
pub const ENCODER_DELAY: u16 = 0x88E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingMode {
    /// Channels carried as independent sound units; mono uses one.
    Independent,
    /// Two channels matrixed and weighted against each other.
    JointStereo,
}

/// Immutable per-stream configuration, fixed at open.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub channels: usize,
    pub sample_rate: u32,
    pub coding_mode: CodingMode,
    pub bytes_per_frame: usize,
    pub bits_per_frame: usize,
    pub scrambled: bool,
    pub version: u32,
    /// Total samples per channel announced by the container, when known.
    pub samples_per_channel: usize,
    pub frame_factor: usize,
}

impl StreamConfig {
    /// Builds a configuration from the container's codec extradata block.
    ///
    /// `fail_level` escalates soft field checks; `log::Level::Warn` turns
    /// reserved-field mismatches into open failures (strict mode).
    pub fn parse(
        channels: usize,
        sample_rate: u32,
        bytes_per_frame: usize,
        extradata: &[u8],
        fail_level: log::Level,
    ) -> Result<Self> {
        match extradata.len() {
            14 => {
                // Plain-transport layout, little-endian.
                let leading = u16::from_le_bytes([extradata[0], extradata[1]]);
                if leading != 1 {
                    log_or_err!(
                        fail_level,
                        Warn,
                        anyhow!(ConfigError::ReservedField {
                            offset: 0,
                            expected: 1,
                            value: leading,
                        })
                    );
                }

                let samples_per_channel = u32::from_le_bytes([
                    extradata[2],
                    extradata[3],
                    extradata[4],
                    extradata[5],
                ]) as usize;

                let mode_flag = u16::from_le_bytes([extradata[6], extradata[7]]);
                let mode_dupe = u16::from_le_bytes([extradata[8], extradata[9]]);
                if mode_dupe != mode_flag {
                    log_or_err!(
                        fail_level,
                        Warn,
                        anyhow!(ConfigError::ReservedField {
                            offset: 8,
                            expected: mode_flag,
                            value: mode_dupe,
                        })
                    );
                }

                let frame_factor = u16::from_le_bytes([extradata[10], extradata[11]]) as usize;

                let trailing = u16::from_le_bytes([extradata[12], extradata[13]]);
                if trailing != 0 {
                    log_or_err!(
                        fail_level,
                        Warn,
                        anyhow!(ConfigError::ReservedField {
                            offset: 12,
                            expected: 0,
                            value: trailing,
                        })
                    );
                }

                let permitted = [96, 152, 192]
                    .iter()
                    .any(|&base| bytes_per_frame == base * channels * frame_factor);
                if !permitted {
                    bail!(ConfigError::InvalidFrameSize {
                        bytes: bytes_per_frame,
                        channels,
                        factor: frame_factor,
                    });
                }

                let coding_mode = if mode_flag != 0 {
                    CodingMode::JointStereo
                } else {
                    CodingMode::Independent
                };

                let mut config = Self::new(
                    channels,
                    sample_rate,
                    coding_mode,
                    bytes_per_frame,
                    false,
                )?;
                config.samples_per_channel = samples_per_channel;
                config.frame_factor = frame_factor;
                Ok(config)
            }
            10 => {
                // Scrambled-transport layout, big-endian.
                let version = u32::from_be_bytes([
                    extradata[0],
                    extradata[1],
                    extradata[2],
                    extradata[3],
                ]);
                if version != STREAM_VERSION {
                    bail!(ConfigError::UnsupportedVersion(version));
                }

                let samples_per_frame =
                    u16::from_be_bytes([extradata[4], extradata[5]]) as usize;
                if samples_per_frame != 1024 * channels {
                    bail!(ConfigError::InvalidSampleCount(samples_per_frame));
                }

                let delay = u16::from_be_bytes([extradata[6], extradata[7]]);
                if delay != ENCODER_DELAY {
                    bail!(ConfigError::UnexpectedDelay(delay));
                }

                let mode = u16::from_be_bytes([extradata[8], extradata[9]]);
                let coding_mode = match mode {
                    0x12 => CodingMode::JointStereo,
                    0x2 | 0x0 => CodingMode::Independent,
                    other => bail!(ConfigError::UnsupportedCodingMode(other)),
                };

                let mut config = Self::new(
                    channels,
                    sample_rate,
                    coding_mode,
                    bytes_per_frame,
                    true,
                )?;
                config.samples_per_channel = samples_per_frame / channels;
                Ok(config)
            }
            other => bail!(ConfigError::ExtradataSize(other)),
        }
    }

    /// Builds a configuration directly from known parameters.
    pub fn new(
        channels: usize,
        sample_rate: u32,
        coding_mode: CodingMode,
        bytes_per_frame: usize,
        scrambled: bool,
    ) -> Result<Self> {
        if channels == 0 || channels > 2 {
            bail!(ConfigError::InvalidChannelCount(channels));
        }
        if coding_mode == CodingMode::JointStereo && channels != 2 {
            bail!(ConfigError::JointStereoChannels(channels));
        }
        if bytes_per_frame == 0 || bytes_per_frame > MAX_FRAME_BYTES {
            bail!(ConfigError::FrameTooLarge(bytes_per_frame, MAX_FRAME_BYTES));
        }

        info!(
            "Opened stream: {} channel(s), {:?}, {} bytes per frame{}",
            channels,
            coding_mode,
            bytes_per_frame,
            if scrambled { ", scrambled transport" } else { "" }
        );

        Ok(Self {
            channels,
            sample_rate,
            coding_mode,
            bytes_per_frame,
            bits_per_frame: bytes_per_frame * 8,
            scrambled,
            version: STREAM_VERSION,
            samples_per_channel: 0,
            frame_factor: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use log::Level;

    fn scrambled_extradata(version: u32, samples: u16, delay: u16, mode: u16) -> [u8; 10] {
        let mut data = [0u8; 10];
        data[..4].copy_from_slice(&version.to_be_bytes());
        data[4..6].copy_from_slice(&samples.to_be_bytes());
        data[6..8].copy_from_slice(&delay.to_be_bytes());
        data[8..10].copy_from_slice(&mode.to_be_bytes());
        data
    }

    #[test]
    fn accepts_the_scrambled_layout() -> Result<()> {
        let data = scrambled_extradata(4, 2048, 0x88E, 0x12);
        let config = StreamConfig::parse(2, 44100, 192, &data, Level::Error)?;

        assert_eq!(config.coding_mode, CodingMode::JointStereo);
        assert!(config.scrambled);
        assert_eq!(config.samples_per_channel, 1024);

        Ok(())
    }

    #[test]
    fn rejects_bad_version_and_delay() {
        let data = scrambled_extradata(5, 2048, 0x88E, 0x12);
        assert!(StreamConfig::parse(2, 44100, 192, &data, Level::Error).is_err());

        let data = scrambled_extradata(4, 2048, 0x123, 0x12);
        assert!(StreamConfig::parse(2, 44100, 192, &data, Level::Error).is_err());

        let data = scrambled_extradata(4, 1024, 0x88E, 0x12);
        assert!(StreamConfig::parse(2, 44100, 192, &data, Level::Error).is_err());
    }

    #[test]
    fn plain_layout_validates_the_frame_size() -> Result<()> {
        let mut data = [0u8; 14];
        data[0] = 1;
        data[2..6].copy_from_slice(&(1024u32 * 100).to_le_bytes());
        data[6] = 1; // joint stereo
        data[8] = 1; // duplicate
        data[10] = 1; // frame factor

        assert!(!StreamConfig::parse(2, 44100, 384, &data, Level::Error)?.scrambled);
        assert!(StreamConfig::parse(2, 44100, 100, &data, Level::Error).is_err());

        Ok(())
    }

    #[test]
    fn strict_mode_rejects_reserved_fields() {
        let mut data = [0u8; 14];
        data[0] = 7; // reserved half-word should be 1
        data[6] = 1;
        data[8] = 1;
        data[10] = 1;

        assert!(StreamConfig::parse(2, 44100, 384, &data, Level::Error).is_ok());
        assert!(StreamConfig::parse(2, 44100, 384, &data, Level::Warn).is_err());
    }

    #[test]
    fn joint_stereo_needs_two_channels() {
        assert!(
            StreamConfig::new(1, 44100, CodingMode::JointStereo, 192, false).is_err()
        );
    }
}
