use anyhow::Result;
use log::warn;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;

pub fn cmd_info(args: &InfoArgs, cli: &Cli) -> Result<()> {
    let config = args.stream.open(cli.strict)?;
    let input = InputReader::new(&args.input)?;

    println!();
    println!("ATRAC3 Stream Information");
    println!("=========================");
    println!();
    println!("Stream Configuration");
    println!("  Channels                  {}", config.channels);
    println!("  Coding mode               {:?}", config.coding_mode);
    println!("  Sample rate               {} Hz", config.sample_rate);
    println!("  Frame size                {} bytes", config.bytes_per_frame);
    println!("  Scrambled transport       {}", config.scrambled);
    if config.samples_per_channel > 0 {
        println!("  Announced samples         {}", config.samples_per_channel);
    }
    println!();

    let Some(total_bytes) = input.total_bytes else {
        warn!("Input is not seekable; no frame statistics");
        return Ok(());
    };

    let frames = total_bytes / config.bytes_per_frame as u64;
    let remainder = total_bytes % config.bytes_per_frame as u64;
    if remainder != 0 {
        warn!("Input carries {remainder} trailing bytes past the last frame");
    }

    let samples = frames * 1024;
    let seconds = samples as f64 / config.sample_rate as f64;
    let bitrate = config.bytes_per_frame as f64 * 8.0 * config.sample_rate as f64 / 1024.0;

    println!("Stream Statistics");
    println!("  Size                      {total_bytes} bytes");
    println!("  Frames                    {frames}");
    println!("  Samples per channel       {samples}");
    println!("  Duration                  {}", time_str(seconds));
    println!("  Data rate                 {:.1} kbps", bitrate / 1000.0);
    println!();

    Ok(())
}

fn time_str(seconds: f64) -> String {
    let whole = seconds as u64;
    let (h, m, s) = (whole / 3600, (whole / 60) % 60, whole % 60);
    let millis = ((seconds - whole as f64) * 1000.0) as u64;
    format!("{h:02}:{m:02}:{s:02}.{millis:03}")
}
