//! Quantized band spectrum reconstruction.
//!
//! A sound unit codes up to 32 subbands of mantissas, each behind a 3-bit
//! quantization selector (0 = not coded) and a 6-bit scale factor index.
//! The same mantissa machinery also feeds the tonal component overlay.

use anyhow::Result;

use crate::data::{
    self, CLC_LENGTHS, CLC_PAIR_VALUES, CodecTables, SUBBAND_OFFSETS, VLC_PAIR_VALUES,
};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::fixed::Q31;

/// Fractional bits kept by the inverse-quantization product: scale factors
/// are stored [`data::SF_SHIFT_DOWN`] bits down to fit Q31.
pub(crate) const SF_SHIFT: u32 = 31 - data::SF_SHIFT_DOWN;

/// Mantissa coding applied throughout one spectral block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MantissaCoding {
    VariableLength,
    FixedLength,
}

impl MantissaCoding {
    pub fn from_flag(fixed: bool) -> Self {
        if fixed {
            MantissaCoding::FixedLength
        } else {
            MantissaCoding::VariableLength
        }
    }
}

/// Combined scale of one subband: scale factor times quantization step.
#[inline]
pub(crate) fn subband_scale(tables: &CodecTables, sf_index: usize, selector: usize) -> Q31 {
    tables.scale_factors[sf_index].mul(tables.quant_scales[selector])
}

/// Reads `dst.len()` quantized mantissas coded with `selector`.
///
/// Selector 1 codes mantissas in pairs; an odd destination leaves its final
/// slot untouched, so callers hand in cleared buffers.
pub fn read_mantissas(
    reader: &mut BsIoSliceReader,
    tables: &CodecTables,
    dst: &mut [i32],
    selector: usize,
    coding: MantissaCoding,
) -> Result<()> {
    match coding {
        MantissaCoding::FixedLength => {
            let bits = CLC_LENGTHS[selector];
            if selector > 1 {
                for value in dst.iter_mut() {
                    *value = if bits > 0 { reader.get_s::<i32>(bits)? } else { 0 };
                }
            } else {
                for pair in dst.chunks_exact_mut(2) {
                    let code = reader.get_n::<u32>(bits)? as usize;
                    pair[0] = CLC_PAIR_VALUES[code >> 2];
                    pair[1] = CLC_PAIR_VALUES[code & 3];
                }
            }
        }
        MantissaCoding::VariableLength => {
            let codebook = &tables.codebooks[selector - 1];
            if selector == 1 {
                for pair in dst.chunks_exact_mut(2) {
                    let symbol = reader.get_codebook(codebook)? as usize;
                    pair[0] = VLC_PAIR_VALUES[symbol][0];
                    pair[1] = VLC_PAIR_VALUES[symbol][1];
                }
            } else {
                for value in dst.iter_mut() {
                    let symbol = reader.get_codebook(codebook)? as i32 + 1;
                    let magnitude = symbol >> 1;
                    *value = if symbol & 1 != 0 { -magnitude } else { magnitude };
                }
            }
        }
    }

    Ok(())
}

/// Restores one channel's quantized band spectrum.
///
/// Returns the coded-subband count read from the stream; the caller derives
/// the number of live QMF bands from it.
pub fn read_spectrum(reader: &mut BsIoSliceReader, spectrum: &mut [i32; 1024]) -> Result<usize> {
    let tables = data::codec_tables();

    let num_subbands = reader.get_n::<u32>(5)? as usize;
    let coding = MantissaCoding::from_flag(reader.get()?);

    let mut selectors = [0usize; 32];
    for selector in selectors.iter_mut().take(num_subbands + 1) {
        *selector = reader.get_n::<u32>(3)? as usize;
    }

    let mut sf_indices = [0usize; 32];
    for (sf_index, &selector) in sf_indices.iter_mut().zip(&selectors).take(num_subbands + 1) {
        if selector != 0 {
            *sf_index = reader.get_n::<u32>(6)? as usize;
        }
    }

    for band in 0..=num_subbands {
        let first = SUBBAND_OFFSETS[band];
        let last = SUBBAND_OFFSETS[band + 1];
        let selector = selectors[band];

        if selector != 0 {
            let lines = &mut spectrum[first..last];
            lines.fill(0);
            read_mantissas(reader, tables, lines, selector, coding)?;

            let scale = subband_scale(tables, sf_indices[band], selector);
            for line in lines.iter_mut() {
                *line = ((*line as i64 * scale.0 as i64) >> SF_SHIFT) as i32;
            }
        } else {
            spectrum[first..last].fill(0);
        }
    }

    spectrum[SUBBAND_OFFSETS[num_subbands + 1]..].fill(0);

    Ok(num_subbands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn uncoded_selectors_zero_the_spectrum() -> Result<()> {
        // num_subbands = 0, variable-length flag, selector[0] = 0.
        let unit = [0u8; 4];
        let mut reader = BsIoSliceReader::from_slice(&unit);

        let mut spectrum = [0x55AAi32; 1024];
        let count = read_spectrum(&mut reader, &mut spectrum)?;

        assert_eq!(count, 0);
        assert!(spectrum.iter().all(|&line| line == 0));

        Ok(())
    }

    #[test]
    fn fixed_length_mantissas_scale_by_the_subband_factor() -> Result<()> {
        // num_subbands = 0 (5 bits), fixed-length flag (1), selector[0] = 2
        // (3 bits), scale factor index 57 (6 bits), then eight 3-bit signed
        // mantissas of +1.
        let mut unit = [0u8; 8];
        let mut bits: u64 = 0;
        let mut len = 0u32;
        for (value, width) in [(0, 5), (1, 1), (2, 3), (57, 6)] {
            bits = (bits << width) | value as u64;
            len += width;
        }
        for _ in 0..8 {
            bits = (bits << 3) | 0b001;
            len += 3;
        }
        bits <<= 64 - len;
        unit.copy_from_slice(&bits.to_be_bytes());

        let mut spectrum = [0i32; 1024];
        let count = read_spectrum(&mut reader_of(&unit), &mut spectrum)?;
        assert_eq!(count, 0);

        // Scale factor 57 is 2^14; selector 2 divides by 2.5.
        let expected = (16384.0 / 2.5) as i32;
        for &line in &spectrum[..8] {
            assert!((line - expected).abs() <= 1, "line {line} vs {expected}");
        }
        assert!(spectrum[8..].iter().all(|&line| line == 0));

        Ok(())
    }

    fn reader_of(buf: &[u8]) -> BsIoSliceReader<'_> {
        BsIoSliceReader::from_slice(buf)
    }
}
