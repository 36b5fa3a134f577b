//! Frame decoding to fixed-point PCM.

use anyhow::{Result, anyhow, bail};
use log::Level::Warn;
use log::trace;

use crate::data::{
    BAND_SAMPLES, MAX_FRAME_BYTES, QMF_BANDS, SAMPLES_PER_CHANNEL, SOUND_UNIT_ID,
    SOUND_UNIT_ID_JOINT, SUBBAND_OFFSETS, SYNC_FILL,
};
use crate::dsp::imdct::imlt;
use crate::dsp::qmf::{self, DELAY_LEN, PortableKernel, QmfKernel};
use crate::dsp::stereo;
use crate::log_or_err;
use crate::structs::channel::ChannelUnit;
use crate::structs::config::{CodingMode, StreamConfig};
use crate::structs::gain;
use crate::structs::spectrum::read_spectrum;
use crate::structs::tonal::{add_tonal_components, read_tonal_components};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::descramble::descramble;
use crate::utils::errors::FrameError;

/// What happens to cross-frame state when a frame fails mid-decode.
///
/// The reference behavior leaves state mutated for whatever was already
/// processed; rollback restores the pre-frame snapshot instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatePolicy {
    #[default]
    Retain,
    Rollback,
}

/// One decoded frame of fixed-point PCM.
///
/// Samples are in channel-block order: `samples_per_channel` words for
/// channel 0 followed by the same for channel 1 when present. The words
/// carry two fractional headroom bits; converting to an output sample type
/// is the caller's responsibility.
#[derive(Debug)]
pub struct DecodedFrame {
    pub pcm: [i32; 2 * SAMPLES_PER_CHANNEL],
    pub channels: usize,
    pub samples_per_channel: usize,
}

impl DecodedFrame {
    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> &[i32] {
        &self.pcm[index * self.samples_per_channel..][..self.samples_per_channel]
    }
}

/// Decodes fixed-size compressed frames into PCM blocks.
///
/// One instance owns all cross-frame state for its stream; frames must be
/// fed in stream order, one call at a time.
pub struct Decoder {
    config: StreamConfig,
    units: [ChannelUnit; 2],

    /// Joint-stereo matrix selector generations, one frame apart.
    matrix_prev: [usize; QMF_BANDS],
    matrix_now: [usize; QMF_BANDS],
    matrix_next: [usize; QMF_BANDS],
    /// Three (flag, index) weight generations, oldest first.
    weighting_delay: [usize; 6],

    kernel: Box<dyn QmfKernel>,
    policy: StatePolicy,
    snapshot: Option<Box<Snapshot>>,
    fail_level: log::Level,
    counter: usize,
}

struct Snapshot {
    units: [ChannelUnit; 2],
    matrix_prev: [usize; QMF_BANDS],
    matrix_now: [usize; QMF_BANDS],
    matrix_next: [usize; QMF_BANDS],
    weighting_delay: [usize; 6],
}

impl Decoder {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_kernel(config, Box::new(PortableKernel))
    }

    /// Opens a decoder with an alternate matrixing/dewindowing kernel.
    pub fn with_kernel(config: StreamConfig, kernel: Box<dyn QmfKernel>) -> Self {
        Self {
            config,
            units: [ChannelUnit::default(), ChannelUnit::default()],
            matrix_prev: [3; QMF_BANDS],
            matrix_now: [3; QMF_BANDS],
            matrix_next: [3; QMF_BANDS],
            weighting_delay: [0, 7, 0, 7, 0, 7],
            kernel,
            policy: StatePolicy::default(),
            snapshot: None,
            fail_level: log::Level::Error,
            counter: 0,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Sets the failure level for soft validations (strict mode).
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    /// Chooses what happens to cross-frame state when a frame fails.
    ///
    /// The rollback snapshot buffer is allocated here, never during decode.
    pub fn set_state_policy(&mut self, policy: StatePolicy) {
        self.policy = policy;
        self.snapshot = match policy {
            StatePolicy::Retain => None,
            StatePolicy::Rollback => Some(Box::new(Snapshot {
                units: self.units.clone(),
                matrix_prev: self.matrix_prev,
                matrix_now: self.matrix_now,
                matrix_next: self.matrix_next,
                weighting_delay: self.weighting_delay,
            })),
        };
    }

    /// Decodes one frame.
    ///
    /// The frame must carry exactly `bytes_per_frame` bytes; longer input
    /// is tolerated with a warning (strict mode fails it) and only the
    /// frame-sized prefix is decoded. A failed frame produces no PCM; the
    /// stream itself stays usable.
    pub fn decode(&mut self, frame: &[u8]) -> Result<DecodedFrame> {
        let expected = self.config.bytes_per_frame;
        if frame.len() < expected {
            bail!(FrameError::FrameTooShort {
                expected,
                actual: frame.len(),
            });
        }
        if frame.len() > expected {
            log_or_err!(
                self.fail_level,
                Warn,
                anyhow!(FrameError::TrailingBytes {
                    expected,
                    actual: frame.len(),
                })
            );
        }

        if let Some(snapshot) = self.snapshot.as_deref_mut() {
            snapshot.units.clone_from(&self.units);
            snapshot.matrix_prev = self.matrix_prev;
            snapshot.matrix_now = self.matrix_now;
            snapshot.matrix_next = self.matrix_next;
            snapshot.weighting_delay = self.weighting_delay;
        }

        match self.decode_frame(&frame[..expected]) {
            Ok(pcm) => {
                self.counter += 1;
                Ok(DecodedFrame {
                    pcm,
                    channels: self.config.channels,
                    samples_per_channel: SAMPLES_PER_CHANNEL,
                })
            }
            Err(e) => {
                if let Some(snapshot) = self.snapshot.as_deref() {
                    self.units.clone_from(&snapshot.units);
                    self.matrix_prev = snapshot.matrix_prev;
                    self.matrix_now = snapshot.matrix_now;
                    self.matrix_next = snapshot.matrix_next;
                    self.weighting_delay = snapshot.weighting_delay;
                }
                Err(e)
            }
        }
    }

    fn decode_frame(&mut self, frame: &[u8]) -> Result<[i32; 2 * SAMPLES_PER_CHANNEL]> {
        let bytes = self.config.bytes_per_frame;
        let channels = self.config.channels;

        let mut buffer = [0u8; MAX_FRAME_BYTES + 3];
        let offset = if self.config.scrambled {
            descramble(frame, &mut buffer)
        } else {
            buffer[..bytes].copy_from_slice(frame);
            0
        };
        let data = &mut buffer[offset..offset + bytes];

        trace!("frame {}: {} bytes, offset {}", self.counter, bytes, offset);

        let mut samples = [0i32; 2 * SAMPLES_PER_CHANNEL];

        match self.config.coding_mode {
            CodingMode::JointStereo => {
                {
                    let mut reader = BsIoSliceReader::from_slice(data);
                    decode_sound_unit(
                        &mut reader,
                        &mut self.units[0],
                        &mut samples[..SAMPLES_PER_CHANNEL],
                        0,
                        CodingMode::JointStereo,
                    )?;
                }

                // The second sound unit is coded in reverse byte order and
                // padded with sync fill.
                data.reverse();
                let mut fill = 0;
                while data[fill] == SYNC_FILL {
                    fill += 1;
                    if fill + 4 > bytes {
                        bail!(FrameError::SyncFillOverrun);
                    }
                }

                let mut reader = BsIoSliceReader::from_slice(&data[fill..]);

                // Shift the weighting and selector histories forward one
                // frame and read the next generation.
                self.weighting_delay.copy_within(2.., 0);
                self.weighting_delay[4] = reader.get()? as usize;
                self.weighting_delay[5] = reader.get_n::<u32>(3)? as usize;

                for band in 0..QMF_BANDS {
                    self.matrix_prev[band] = self.matrix_now[band];
                    self.matrix_now[band] = self.matrix_next[band];
                    self.matrix_next[band] = reader.get_n::<u32>(2)? as usize;
                }

                decode_sound_unit(
                    &mut reader,
                    &mut self.units[1],
                    &mut samples[SAMPLES_PER_CHANNEL..],
                    1,
                    CodingMode::JointStereo,
                )?;

                let (ch0, ch1) = samples.split_at_mut(SAMPLES_PER_CHANNEL);
                stereo::reverse_matrixing(ch0, ch1, &self.matrix_prev, &self.matrix_now);
                stereo::channel_weighting(ch0, ch1, &self.weighting_delay);
            }
            CodingMode::Independent => {
                for ch in 0..channels {
                    let start = ch * bytes / channels;
                    let mut reader =
                        BsIoSliceReader::from_slice(&data[start..start + bytes / channels]);
                    decode_sound_unit(
                        &mut reader,
                        &mut self.units[ch],
                        &mut samples[ch * SAMPLES_PER_CHANNEL..][..SAMPLES_PER_CHANNEL],
                        ch,
                        CodingMode::Independent,
                    )?;
                }
            }
        }

        // Reconstruct the full-band signal per channel.
        let mut temp = [0i32; DELAY_LEN + SAMPLES_PER_CHANNEL];
        let kernel = self.kernel.as_ref();

        for (ch, unit) in self.units.iter_mut().enumerate().take(channels) {
            let base = ch * SAMPLES_PER_CHANNEL;
            let (b0, b1, b2, b3) = (base, base + 256, base + 512, base + 768);

            qmf::synthesize(kernel, &mut samples, b0, b1, b0, 256, &mut unit.delay[0], &mut temp);
            qmf::synthesize(kernel, &mut samples, b3, b2, b2, 256, &mut unit.delay[1], &mut temp);
            qmf::synthesize(kernel, &mut samples, b0, b2, b0, 512, &mut unit.delay[2], &mut temp);
        }

        Ok(samples)
    }
}

/// Decodes one channel's sound unit into `out`.
///
/// Runs the full per-channel pipeline: gain envelopes, tonal overlay, band
/// spectrum, inverse transform and gain-compensated overlap-add. The gain
/// generations swap only when the whole unit decoded cleanly.
fn decode_sound_unit(
    reader: &mut BsIoSliceReader,
    unit: &mut ChannelUnit,
    out: &mut [i32],
    channel: usize,
    mode: CodingMode,
) -> Result<()> {
    if mode == CodingMode::JointStereo && channel == 1 {
        let id = reader.get_n::<u32>(2)?;
        if id != SOUND_UNIT_ID_JOINT {
            bail!(FrameError::SoundUnitSync {
                channel,
                read: id,
                expected: SOUND_UNIT_ID_JOINT,
            });
        }
    } else {
        let id = reader.get_n::<u32>(6)?;
        if id != SOUND_UNIT_ID {
            bail!(FrameError::SoundUnitSync {
                channel,
                read: id,
                expected: SOUND_UNIT_ID,
            });
        }
    }

    unit.bands_coded = reader.get_n::<u32>(2)? as usize;
    let switch = unit.gain_switch;

    unit.gain_block[switch].read(reader, unit.bands_coded)?;

    unit.num_components =
        read_tonal_components(reader, &mut unit.components, unit.bands_coded)?;

    let num_subbands = read_spectrum(reader, &mut unit.spectrum)?;

    let last_tonal =
        add_tonal_components(&mut unit.spectrum, &unit.components[..unit.num_components]);

    // Highest band carrying spectral or tonal energy; -1 means none.
    let mut live_bands = (SUBBAND_OFFSETS[num_subbands] as i32 - 1) >> 8;
    if last_tonal >= 0 {
        live_bands = live_bands.max((last_tonal + BAND_SAMPLES as i32) >> 8);
    }

    // Two fractional headroom bits for the fixed-point transform chain.
    for line in unit.spectrum.iter_mut() {
        *line <<= 2;
    }

    for band in 0..QMF_BANDS {
        let range = band * BAND_SAMPLES..(band + 1) * BAND_SAMPLES;

        if (band as i32) <= live_bands {
            imlt(
                &mut unit.spectrum[range.clone()],
                &mut unit.imdct_buf[..2 * BAND_SAMPLES],
                band & 1 == 1,
            );
        } else {
            unit.imdct_buf[..2 * BAND_SAMPLES].fill(0);
        }

        gain::compensate_and_overlap(
            &unit.imdct_buf[..2 * BAND_SAMPLES],
            &mut unit.prev_frame[range.clone()],
            &mut out[range],
            &unit.gain_block[1 - switch].envelope[band],
            &unit.gain_block[switch].envelope[band],
        );
    }

    unit.gain_switch ^= 1;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::config::{CodingMode, StreamConfig};
    use anyhow::Result;

    /// Bit-packs a silent sound unit: id 0x28, no coded bands beyond band
    /// 0, empty gain envelope, no tonal components, empty spectrum.
    fn silent_unit() -> Vec<u8> {
        // 6 + 2 + 3 + 5 + 5 + 1 + 3 = 25 bits
        let mut bits: u64 = 0;
        for (value, width) in [
            (SOUND_UNIT_ID as u64, 6), // sound unit id
            (0, 2),                    // bands coded
            (0, 3),                    // gain: no breakpoints in band 0
            (0, 5),                    // no tonal components
            (0, 5),                    // one coded subband counted
            (0, 1),                    // variable-length mantissas
            (0, 3),                    // subband 0 not coded
        ] {
            bits = (bits << width) | value;
        }
        bits <<= 64 - 25;
        bits.to_be_bytes().to_vec()
    }

    fn mono_config(bytes_per_frame: usize) -> StreamConfig {
        StreamConfig::new(1, 44100, CodingMode::Independent, bytes_per_frame, false).unwrap()
    }

    #[test]
    fn all_zero_unit_yields_all_zero_output() -> Result<()> {
        let mut frame = vec![0u8; 192];
        frame[..8].copy_from_slice(&silent_unit());

        let mut decoder = Decoder::new(mono_config(192));
        let decoded = decoder.decode(&frame)?;

        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples_per_channel, 1024);
        assert!(decoded.channel(0).iter().all(|&s| s == 0));

        Ok(())
    }

    #[test]
    fn sound_unit_id_mismatch_fails_the_frame() {
        let frame = vec![0u8; 192];
        let mut decoder = Decoder::new(mono_config(192));

        let err = decoder.decode(&frame).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FrameError>(),
            Some(FrameError::SoundUnitSync { channel: 0, .. })
        ));
    }

    #[test]
    fn short_frames_are_rejected_without_touching_state() {
        let mut decoder = Decoder::new(mono_config(192));
        let err = decoder.decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FrameError>(),
            Some(FrameError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn trailing_bytes_fail_in_strict_mode() -> Result<()> {
        let mut frame = vec![0u8; 200];
        frame[..8].copy_from_slice(&silent_unit());

        let mut decoder = Decoder::new(mono_config(192));
        decoder.decode(&frame)?;

        decoder.set_fail_level(log::Level::Warn);
        assert!(decoder.decode(&frame).is_err());

        Ok(())
    }

    #[test]
    fn stereo_frames_decode_both_units() -> Result<()> {
        let mut frame = vec![0u8; 384];
        frame[..8].copy_from_slice(&silent_unit());
        frame[192..200].copy_from_slice(&silent_unit());

        let config =
            StreamConfig::new(2, 44100, CodingMode::Independent, 384, false).unwrap();
        let mut decoder = Decoder::new(config);
        let decoded = decoder.decode(&frame)?;

        assert_eq!(decoded.channels, 2);
        assert!(decoded.pcm.iter().all(|&s| s == 0));

        Ok(())
    }

    #[test]
    fn joint_stereo_frame_with_reversed_second_unit() -> Result<()> {
        // Second unit bitstream: 1 + 3 weighting bits, 4 x 2 selector bits
        // (all 3), short id 3, then a silent unit body.
        let mut bits: u64 = 0;
        let mut len = 0;
        for (value, width) in [
            (0u64, 1), // weighting flag
            (7, 3),    // weighting index: unity
            (3, 2),    // selectors, band 0..3
            (3, 2),
            (3, 2),
            (3, 2),
            (SOUND_UNIT_ID_JOINT as u64, 2),
            (0, 2), // bands coded
            (0, 3), // gain
            (0, 5), // tonal
            (0, 5), // spectrum subband count
            (0, 1), // coding mode
            (0, 3), // selector 0
        ] {
            bits = (bits << width) | value;
            len += width;
        }
        bits <<= 64 - len;
        let packed = bits.to_be_bytes();
        let unit2 = &packed[..(len as usize).div_ceil(8)];

        let mut frame = vec![0u8; 384];
        frame[..8].copy_from_slice(&silent_unit());
        // The frame tail reverses into sync fill followed by the unit.
        let tail = 384 - unit2.len() - 2;
        for (i, &b) in unit2.iter().rev().enumerate() {
            frame[tail + i] = b;
        }
        frame[382] = SYNC_FILL;
        frame[383] = SYNC_FILL;

        let config = StreamConfig::new(2, 44100, CodingMode::JointStereo, 384, false).unwrap();
        let mut decoder = Decoder::new(config);
        let decoded = decoder.decode(&frame)?;

        assert_eq!(decoded.channels, 2);
        assert!(decoded.pcm.iter().all(|&s| s == 0));

        Ok(())
    }

    #[test]
    fn rollback_restores_state_after_a_half_failed_frame() -> Result<()> {
        // Channel 0 carries energy (one CLC-coded subband), channel 1 hits
        // a sound-unit sync error, so the frame fails after channel 0's
        // overlap state was already written.
        let mut bits: u64 = 0;
        let mut len = 0;
        for (value, width) in [
            (SOUND_UNIT_ID as u64, 6),
            (0, 2),  // bands coded
            (0, 3),  // gain: no breakpoints
            (0, 5),  // no tonal components
            (1, 5),  // two coded subbands counted
            (1, 1),  // fixed-length mantissas
            (2, 3),  // subband 0 selector 2
            (0, 3),  // subband 1 not coded
            (60, 6), // scale factor index for subband 0
        ] {
            bits = (bits << width) | value;
            len += width;
        }
        // Eight 3-bit mantissas of +1 for subband 0.
        for _ in 0..8 {
            bits = (bits << 3) | 1;
            len += 3;
        }
        bits <<= 64 - len;
        let unit = bits.to_be_bytes();

        let mut bad_frame = vec![0u8; 384];
        bad_frame[..8].copy_from_slice(&unit);
        // Channel 1's half stays zero: its id read fails the sync check.

        let mut silent_frame = vec![0u8; 384];
        silent_frame[..8].copy_from_slice(&silent_unit());
        silent_frame[192..200].copy_from_slice(&silent_unit());

        let config =
            StreamConfig::new(2, 44100, CodingMode::Independent, 384, false).unwrap();

        let mut retain = Decoder::new(config.clone());
        retain.set_state_policy(StatePolicy::Retain);
        assert!(retain.decode(&bad_frame).is_err());
        let after_retain = retain.decode(&silent_frame)?;

        let mut rollback = Decoder::new(config);
        rollback.set_state_policy(StatePolicy::Rollback);
        assert!(rollback.decode(&bad_frame).is_err());
        let after_rollback = rollback.decode(&silent_frame)?;

        // The retained overlap tail from the half-decoded frame rings into
        // the next frame; rollback forgets it.
        assert!(after_retain.channel(0).iter().any(|&s| s != 0));
        assert!(after_rollback.pcm.iter().all(|&s| s == 0));

        Ok(())
    }
}
