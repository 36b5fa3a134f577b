//! Bitstream I/O for compressed sound units.
//!
//! Provides the sequential bit reader consumed by every decode stage and
//! LUT-based canonical Huffman codebooks for the spectral mantissa tables.

use std::io;
use std::io::SeekFrom;

use bitstream_io::{BigEndian, BitRead, BitReader, SignedInteger, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }

    #[inline(always)]
    pub fn get_s<S: SignedInteger>(&mut self, n: u32) -> io::Result<S> {
        match self.bs.read_signed_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_s({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }

    /// Decodes one canonical Huffman symbol.
    ///
    /// Reads up to the codebook's longest code, resolves the symbol through
    /// the flat lookup table, then rewinds the unconsumed bits.
    #[inline(always)]
    pub fn get_codebook(&mut self, codebook: &Codebook) -> io::Result<u8> {
        let avail = (self.available()?).min(codebook.max_bits as u64) as u32;
        if avail == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "get_codebook: out of bounds bits",
            ));
        }

        let word = self.get_n::<u32>(avail)? << (codebook.max_bits - avail);
        let (symbol, len) = codebook.lut[word as usize];

        if len as u32 > avail {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "get_codebook: code runs past the end of the unit",
            ));
        }

        self.seek(-((avail - len as u32) as i64))?;

        Ok(symbol)
    }

    #[inline(always)]
    pub fn seek(&mut self, offset: i64) -> io::Result<u64> {
        if (offset < 0 && self.position()? as i64 + offset >= 0)
            || (offset >= 0 && self.available()? as i64 >= offset)
        {
            return self.bs.seek_bits(SeekFrom::Current(offset));
        }

        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "seek({}): out of bounds bits at {}",
                offset,
                self.position()?
            ),
        ))
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        self.bs.skip(n)
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits().map(|pos| self.len - pos)
    }

    #[inline(always)]
    pub fn position(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits()
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

/// Canonical Huffman codebook flattened into a fixed lookup table.
///
/// Every `max_bits`-wide prefix maps to its (symbol, code length) pair, so
/// decode is a single indexed load. Complete codes leave no zero-length
/// slots; the tables here are all complete.
#[derive(Debug, Clone)]
pub struct Codebook {
    lut: Vec<(u8, u8)>,
    max_bits: u32,
}

impl Codebook {
    pub fn from_codes(codes: &[u8], lengths: &[u8]) -> Self {
        debug_assert_eq!(codes.len(), lengths.len());

        let max_bits = lengths.iter().copied().max().unwrap_or(0) as u32;
        let mut lut = vec![(0u8, 0u8); 1 << max_bits];

        for (symbol, (&code, &len)) in codes.iter().zip(lengths).enumerate() {
            let pad = max_bits - len as u32;
            let base = (code as usize) << pad;
            for slot in lut[base..base + (1 << pad)].iter_mut() {
                *slot = (symbol as u8, len);
            }
        }

        Self { lut, max_bits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn codebook_roundtrip() -> Result<()> {
        // Codes 0, 10, 110, 111 over symbols 0..4.
        let codebook = Codebook::from_codes(&[0b0, 0b10, 0b110, 0b111], &[1, 2, 3, 3]);

        let data = [0b0_10_110_1u8, 0b11_0_0000_0u8];
        let mut reader = BsIoSliceReader::from_slice(&data);

        assert_eq!(reader.get_codebook(&codebook)?, 0);
        assert_eq!(reader.get_codebook(&codebook)?, 1);
        assert_eq!(reader.get_codebook(&codebook)?, 2);
        assert_eq!(reader.get_codebook(&codebook)?, 3);
        assert_eq!(reader.get_codebook(&codebook)?, 0);
        assert_eq!(reader.position()?, 10);

        Ok(())
    }

    #[test]
    fn codebook_near_end() -> Result<()> {
        let codebook = Codebook::from_codes(&[0b0, 0b10, 0b110, 0b111], &[1, 2, 3, 3]);

        // A single zero bit is a complete code even with the table's
        // longest code unavailable.
        let data = [0b0000_0000u8];
        let mut reader = BsIoSliceReader::from_slice(&data);
        reader.skip_n(7)?;
        assert_eq!(reader.get_codebook(&codebook)?, 0);

        Ok(())
    }
}
