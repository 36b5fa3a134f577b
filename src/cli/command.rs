use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

use atrac3::structs::config::{CodingMode, StreamConfig};

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Tools for inspecting and decoding ATRAC3 audio streams",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a raw frame stream into PCM audio.
    Decode(DecodeArgs),

    /// Print stream information
    Info(InfoArgs),
}

/// Raw frame streams carry no container header, so the stream layout comes
/// from these flags or from a codec configuration block on disk.
#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Channel layout and coding mode.
    #[arg(long, value_enum, default_value_t = Mode::Joint)]
    pub mode: Mode,

    /// Sample rate in Hz.
    #[arg(long, value_name = "HZ", default_value_t = 44100)]
    pub sample_rate: u32,

    /// Compressed frame size in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = 384)]
    pub frame_bytes: usize,

    /// The frames went through the scrambled transport.
    #[arg(long)]
    pub scrambled: bool,

    /// Codec configuration block (10 or 14 bytes) to validate instead of
    /// trusting --mode/--scrambled.
    #[arg(long, value_name = "FILE")]
    pub extradata: Option<PathBuf>,
}

impl StreamArgs {
    pub fn open(&self, strict: bool) -> Result<StreamConfig> {
        let fail_level = if strict {
            log::Level::Warn
        } else {
            log::Level::Error
        };

        if let Some(path) = &self.extradata {
            let extradata = std::fs::read(path)?;
            return Ok(StreamConfig::parse(
                self.mode.channels(),
                self.sample_rate,
                self.frame_bytes,
                &extradata,
                fail_level,
            )?);
        }

        Ok(StreamConfig::new(
            self.mode.channels(),
            self.sample_rate,
            self.mode.coding_mode(),
            self.frame_bytes,
            self.scrambled,
        )?)
    }
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input frame stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path for the decoded audio.
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Audio format for output.
    #[arg(long, value_enum, default_value_t = AudioFormat::Wav)]
    pub format: AudioFormat,

    #[command(flatten)]
    pub stream: StreamArgs,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input frame stream.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[command(flatten)]
    pub stream: StreamArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    /// One independent channel.
    Mono,
    /// Two independently coded channels.
    Stereo,
    /// Two jointly matrixed channels.
    Joint,
}

impl Mode {
    pub fn channels(self) -> usize {
        match self {
            Mode::Mono => 1,
            Mode::Stereo | Mode::Joint => 2,
        }
    }

    pub fn coding_mode(self) -> CodingMode {
        match self {
            Mode::Mono | Mode::Stereo => CodingMode::Independent,
            Mode::Joint => CodingMode::JointStereo,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AudioFormat {
    /// RIFF WAVE, 16-bit PCM.
    Wav,
    /// Raw PCM (16-bit little-endian, interleaved).
    Pcm,
}
