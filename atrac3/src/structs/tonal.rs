//! Sparse tonal component overlay.
//!
//! Narrow spectral features are coded separately from the subband spectrum
//! and merged back additively before the inverse transform.

use anyhow::{Result, bail};

use crate::data::{self, MAX_TONAL_COMPONENTS, SAMPLES_PER_CHANNEL};
use crate::structs::spectrum::{MantissaCoding, SF_SHIFT, read_mantissas, subband_scale};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::FrameError;

/// One tonal component: a short run of coefficients at a spectral position.
#[derive(Debug, Clone, Copy, Default)]
pub struct TonalComponent {
    pub position: usize,
    pub num_coefs: usize,
    pub coef: [i32; 8],
}

/// Reads the tonal overlay for one sound unit.
///
/// Returns the number of components stored, or fails the frame on an
/// invalid coding-mode selector, an invalid quantization step, or a
/// component total past the storage bound.
pub fn read_tonal_components(
    reader: &mut BsIoSliceReader,
    components: &mut [TonalComponent; MAX_TONAL_COMPONENTS],
    bands_coded: usize,
) -> Result<usize> {
    let declared = reader.get_n::<u32>(5)? as usize;
    if declared == 0 {
        return Ok(0);
    }

    let tables = data::codec_tables();

    let mode_selector = reader.get_n::<u32>(2)?;
    if mode_selector == 2 {
        bail!(FrameError::InvalidTonalCodingMode);
    }
    let mut coding = MantissaCoding::from_flag(mode_selector & 1 != 0);

    let mut count = 0;
    for _ in 0..declared {
        let mut band_active = [false; 4];
        for flag in band_active.iter_mut().take(bands_coded + 1) {
            *flag = reader.get()?;
        }

        let coefs_per_component = reader.get_n::<u32>(3)? as usize;

        let quant_step = reader.get_n::<u32>(3)? as usize;
        if quant_step <= 1 {
            bail!(FrameError::InvalidToneQuantStep(quant_step));
        }

        if mode_selector == 3 {
            coding = MantissaCoding::from_flag(reader.get()?);
        }

        for quarter in 0..(bands_coded + 1) * 4 {
            if !band_active[quarter >> 2] {
                continue;
            }

            let here = reader.get_n::<u32>(3)? as usize;
            if count + here > MAX_TONAL_COMPONENTS {
                bail!(FrameError::TooManyTonalComponents(count + here));
            }

            for _ in 0..here {
                let sf_index = reader.get_n::<u32>(6)? as usize;

                let component = &mut components[count];
                component.position = quarter * 64 + reader.get_n::<u32>(6)? as usize;
                component.num_coefs =
                    (coefs_per_component + 1).min(SAMPLES_PER_CHANNEL - component.position);

                let scale = subband_scale(tables, sf_index, quant_step);

                let mut mantissas = [0i32; 8];
                read_mantissas(
                    reader,
                    tables,
                    &mut mantissas[..component.num_coefs],
                    quant_step,
                    coding,
                )?;

                for (coef, &mantissa) in component.coef.iter_mut().zip(&mantissas) {
                    *coef = ((mantissa as i64 * scale.0 as i64) >> SF_SHIFT) as i32;
                }

                count += 1;
            }
        }
    }

    Ok(count)
}

/// Merges the tonal overlay into the regular spectrum.
///
/// Returns the last spectral line a component touched, or -1 when the
/// overlay is empty.
pub fn add_tonal_components(spectrum: &mut [i32; 1024], components: &[TonalComponent]) -> i32 {
    let mut last = -1i32;

    for component in components {
        last = last.max((component.position + component.num_coefs) as i32);

        let lines = &mut spectrum[component.position..];
        for (line, &coef) in lines.iter_mut().zip(&component.coef[..component.num_coefs]) {
            *line += coef;
        }
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn pack(fields: &[(u64, u32)]) -> Vec<u8> {
        let mut bits: u128 = 0;
        let mut len = 0u32;
        for &(value, width) in fields {
            bits = (bits << width) | value as u128;
            len += width;
        }
        bits <<= 128 - len;
        bits.to_be_bytes()[..len.div_ceil(8) as usize].to_vec()
    }

    #[test]
    fn no_components() -> Result<()> {
        let unit = pack(&[(0, 5)]);
        let mut components = [TonalComponent::default(); MAX_TONAL_COMPONENTS];
        let mut reader = BsIoSliceReader::from_slice(&unit);

        assert_eq!(
            read_tonal_components(&mut reader, &mut components, 0)?,
            0
        );

        Ok(())
    }

    #[test]
    fn coding_mode_two_fails_the_frame() {
        let unit = pack(&[(1, 5), (2, 2)]);
        let mut components = [TonalComponent::default(); MAX_TONAL_COMPONENTS];
        let mut reader = BsIoSliceReader::from_slice(&unit);

        let err = read_tonal_components(&mut reader, &mut components, 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FrameError>(),
            Some(FrameError::InvalidTonalCodingMode)
        ));
    }

    #[test]
    fn low_quant_step_fails_the_frame() {
        for step in [0u64, 1] {
            // one component, VLC mode, band 0 active, 1 coefficient
            let unit = pack(&[(1, 5), (0, 2), (1, 1), (0, 3), (step, 3)]);
            let mut components = [TonalComponent::default(); MAX_TONAL_COMPONENTS];
            let mut reader = BsIoSliceReader::from_slice(&unit);

            let err = read_tonal_components(&mut reader, &mut components, 0).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<FrameError>(),
                Some(FrameError::InvalidToneQuantStep(_))
            ));
        }
    }

    #[test]
    fn merge_reports_last_line() {
        let mut spectrum = [0i32; 1024];
        let components = [
            TonalComponent {
                position: 100,
                num_coefs: 3,
                coef: [5, -5, 5, 0, 0, 0, 0, 0],
            },
            TonalComponent {
                position: 1020,
                num_coefs: 4,
                coef: [1, 1, 1, 1, 0, 0, 0, 0],
            },
        ];

        assert_eq!(add_tonal_components(&mut spectrum, &components), 1024);
        assert_eq!(&spectrum[100..103], &[5, -5, 5]);
        assert_eq!(&spectrum[1020..], &[1, 1, 1, 1]);
    }
}
