use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};

use atrac3::process::decode::{DecodedFrame, Decoder};

use super::command::{AudioFormat, Cli, DecodeArgs};
use crate::input::InputReader;
use crate::wav::WavWriter;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let config = args.stream.open(cli.strict)?;

    let mut input = InputReader::new(&args.input)?;
    let mut decoder = Decoder::new(config.clone());
    if cli.strict {
        decoder.set_fail_level(log::Level::Warn);
    }

    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, args.format));

    info!(
        "Decoding {} -> {}",
        args.input.display(),
        output_path.display()
    );

    let pb = multi.map(|multi| match input.total_bytes {
        Some(total) => {
            let frames = total / config.bytes_per_frame as u64;
            let pb = multi.add(ProgressBar::new(frames));
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})",
                )
                .expect("static template")
                .progress_chars("#>-"),
            );
            pb
        }
        None => multi.add(ProgressBar::new_spinner()),
    });

    let file = File::create(&output_path)?;
    let mut sink = match args.format {
        AudioFormat::Wav => {
            let mut writer = WavWriter::new(file);
            writer.configure_audio_format(config.sample_rate, config.channels as u32)?;
            writer.write_header()?;
            Sink::Wav(writer)
        }
        AudioFormat::Pcm => Sink::Pcm(file),
    };

    let mut frame = vec![0u8; config.bytes_per_frame];
    let mut interleaved = vec![0i16; config.channels * 1024];
    let mut frames = 0usize;
    let mut failed = 0usize;

    while input.read_frame(&mut frame)? {
        match decoder.decode(&frame) {
            Ok(decoded) => interleave(&decoded, &mut interleaved),
            Err(e) => {
                if cli.strict {
                    return Err(e);
                }
                // A lost frame becomes silence; the stream goes on.
                failed += 1;
                warn!("Frame {frames}: {e}");
                interleaved.fill(0);
            }
        }

        match &mut sink {
            Sink::Wav(writer) => writer.write_pcm_16bit(&interleaved)?,
            Sink::Pcm(file) => {
                for sample in &interleaved {
                    file.write_all(&sample.to_le_bytes())?;
                }
            }
        }

        frames += 1;
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    if let Sink::Wav(writer) = &mut sink {
        writer.finish()?;
    }

    let seconds = frames as f64 * 1024.0 / config.sample_rate as f64;
    info!(
        "Decoded {frames} frame(s) ({seconds:.2} s), {failed} failed",
    );

    Ok(())
}

enum Sink {
    Wav(WavWriter<File>),
    Pcm(File),
}

fn default_output_path(input: &Path, format: AudioFormat) -> PathBuf {
    let extension = match format {
        AudioFormat::Wav => "wav",
        AudioFormat::Pcm => "pcm",
    };

    if input.as_os_str() == "-" {
        return PathBuf::from(format!("out.{extension}"));
    }

    input.with_extension(extension)
}

/// Interleaves the channel-block PCM and drops the two fractional
/// headroom bits down to 16-bit output samples.
fn interleave(decoded: &DecodedFrame, out: &mut [i16]) {
    for sample in 0..decoded.samples_per_channel {
        for ch in 0..decoded.channels {
            let word = decoded.channel(ch)[sample] >> 2;
            out[sample * decoded.channels + ch] =
                word.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
    }
}
