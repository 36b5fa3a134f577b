#[macro_export]
macro_rules! log_or_err {
    ($fail_level:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Codec configuration must be 10 or 14 bytes, got {0}")]
    ExtradataSize(usize),

    #[error("Unsupported stream version {0}, expected 4")]
    UnsupportedVersion(u32),

    #[error("Unexpected encoder delay {0:#X}, expected 0x88E")]
    UnexpectedDelay(u16),

    #[error("Unknown channel coding mode {0:#X}")]
    UnsupportedCodingMode(u16),

    #[error("Channel count must be 1 or 2, got {0}")]
    InvalidChannelCount(usize),

    #[error("Joint stereo requires 2 channels, got {0}")]
    JointStereoChannels(usize),

    #[error("Samples per frame must be 1024 per channel, got {0}")]
    InvalidSampleCount(usize),

    #[error(
        "Frame size {bytes} does not match any permitted layout for {channels} channel(s) with frame factor {factor}"
    )]
    InvalidFrameSize {
        bytes: usize,
        channels: usize,
        factor: usize,
    },

    #[error("Frame size {0} exceeds the internal frame buffer ({1} bytes)")]
    FrameTooLarge(usize, usize),

    #[error("Reserved configuration field at byte {offset} should be {expected}, read {value}")]
    ReservedField {
        offset: usize,
        expected: u16,
        value: u16,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("Frame must carry at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("Frame carries {actual} bytes, only the first {expected} are decoded")]
    TrailingBytes { expected: usize, actual: usize },

    #[error(
        "Sound unit identifier mismatch on channel {channel}: read {read:#X}, expected {expected:#X}"
    )]
    SoundUnitSync {
        channel: usize,
        read: u32,
        expected: u32,
    },

    #[error("Tonal coding mode selector 2 is not a valid stream value")]
    InvalidTonalCodingMode,

    #[error("Tonal quantization step index {0} must be greater than 1")]
    InvalidToneQuantStep(usize),

    #[error("Tonal component total {0} exceeds the 64-component bound")]
    TooManyTonalComponents(usize),

    #[error("Gain breakpoint locations must increase in band {band}: {prev} then {next}")]
    GainLocationOrder {
        band: usize,
        prev: usize,
        next: usize,
    },

    #[error("Joint stereo sync fill runs past the end of the frame")]
    SyncFillOverrun,
}
