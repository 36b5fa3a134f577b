use std::io::{self, BufWriter, Seek, SeekFrom, Write};

/// RIFF WAVE writer for 16-bit PCM audio.
pub struct WavWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    riff_size_position: u64,
    data_size_position: u64,
    data_written: u64,
    sample_rate: u32,
    channels: u32,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            riff_size_position: 0,
            data_size_position: 0,
            data_written: 0,
            sample_rate: 44100,
            channels: 2,
        }
    }

    /// Configure audio format parameters
    pub fn configure_audio_format(&mut self, sample_rate: u32, channels: u32) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }

        self.sample_rate = sample_rate;
        self.channels = channels;
        Ok(())
    }

    /// Write the RIFF/fmt/data headers with placeholder sizes
    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(b"RIFF")?;
        self.riff_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // patched by finish()
        self.writer.write_all(b"WAVE")?;

        self.writer.write_all(b"fmt ")?;
        self.writer.write_all(&16u32.to_le_bytes())?;
        self.writer.write_all(&1u16.to_le_bytes())?; // PCM format
        self.writer.write_all(&(self.channels as u16).to_le_bytes())?;
        self.writer.write_all(&self.sample_rate.to_le_bytes())?;

        let byte_rate = self.sample_rate * self.channels * 2;
        self.writer.write_all(&byte_rate.to_le_bytes())?;

        let block_align = self.channels * 2;
        self.writer.write_all(&(block_align as u16).to_le_bytes())?;
        self.writer.write_all(&16u16.to_le_bytes())?;

        self.writer.write_all(b"data")?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // patched by finish()

        Ok(())
    }

    /// Write interleaved 16-bit samples
    pub fn write_pcm_16bit(&mut self, samples: &[i16]) -> io::Result<()> {
        for &sample in samples {
            self.writer.write_all(&sample.to_le_bytes())?;
            self.data_written += 2;
        }
        Ok(())
    }

    /// Finish writing and update the chunk size headers
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        let current_pos = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer
            .write_all(&(self.data_written as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(self.riff_size_position))?;
        self.writer
            .write_all(&((current_pos - 8) as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        Ok(())
    }

    /// Get the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    /// Get statistics about written data
    pub fn stats(&self) -> WavStats {
        WavStats {
            data_written: self.data_written,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Statistics about WAV file writing
#[derive(Debug, Clone)]
pub struct WavStats {
    pub data_written: u64,
    pub sample_rate: u32,
    pub channels: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_wav_header_write() -> io::Result<()> {
        let buffer = Vec::new();
        let cursor = Cursor::new(buffer);
        let mut writer = WavWriter::new(cursor);

        writer.configure_audio_format(44100, 2)?;
        writer.write_header()?;

        let cursor = writer.into_inner()?;
        let buffer = cursor.into_inner();

        assert_eq!(&buffer[0..4], b"RIFF");
        assert_eq!(&buffer[8..12], b"WAVE");
        assert_eq!(&buffer[12..16], b"fmt ");
        assert_eq!(&buffer[36..40], b"data");

        Ok(())
    }

    #[test]
    fn test_wav_sizes_patched() -> io::Result<()> {
        let cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(cursor);

        writer.configure_audio_format(44100, 1)?;
        writer.write_header()?;
        writer.write_pcm_16bit(&[100, -100, 0, 32767])?;

        let stats = writer.stats();
        assert_eq!(stats.data_written, 8);

        writer.finish()?;

        let buffer = writer.into_inner()?.into_inner();
        let data_size = u32::from_le_bytes(buffer[40..44].try_into().unwrap());
        assert_eq!(data_size, 8);
        let riff_size = u32::from_le_bytes(buffer[4..8].try_into().unwrap());
        assert_eq!(riff_size as usize, buffer.len() - 8);

        Ok(())
    }
}
