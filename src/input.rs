use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Result;

/// Whole-frame reader over a file or stdin.
pub struct InputReader {
    reader: Box<dyn Read>,
    /// Input size in bytes when the source is seekable.
    pub total_bytes: Option<u64>,
}

impl InputReader {
    pub fn new(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self {
                reader: Box::new(io::stdin().lock()),
                total_bytes: None,
            });
        }

        let file = File::open(path)?;
        let total_bytes = file.metadata().ok().map(|m| m.len());

        Ok(Self {
            reader: Box::new(file),
            total_bytes,
        })
    }

    /// Fills `frame` completely, or returns false at a clean end of input.
    ///
    /// A trailing partial frame is reported and discarded.
    pub fn read_frame(&mut self, frame: &mut [u8]) -> Result<bool> {
        let mut filled = 0;

        while filled < frame.len() {
            let n = self.reader.read(&mut frame[filled..])?;
            if n == 0 {
                if filled > 0 {
                    log::warn!(
                        "Discarding a trailing partial frame ({filled} of {} bytes)",
                        frame.len()
                    );
                }
                return Ok(false);
            }
            filled += n;
        }

        Ok(true)
    }
}
