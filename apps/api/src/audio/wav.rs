//! WAV container encoder for raw PCM returned by the speech model.
//!
//! The model returns little-endian linear PCM (mono, 24 kHz, 16-bit by default).
//! Samples are passed through unchanged, so the data chunk is byte-identical to
//! the input and its length equals the input length.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use super::AudioError;

pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// Bytes per sample.
pub const DEFAULT_SAMPLE_WIDTH: u16 = 2;

/// Size of the canonical PCM header (RIFF + fmt + data chunk headers).
pub const WAV_HEADER_LEN: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_width: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_width: DEFAULT_SAMPLE_WIDTH,
        }
    }
}

impl PcmFormat {
    /// Reads the rate from a mime type such as `audio/L16;codec=pcm;rate=24000`.
    /// Anything missing or unparseable keeps the defaults.
    pub fn from_mime_type(mime_type: &str) -> Self {
        let mut format = Self::default();
        for param in mime_type.split(';').skip(1) {
            if let Some((key, value)) = param.trim().split_once('=') {
                if key.trim().eq_ignore_ascii_case("rate") {
                    if let Ok(rate) = value.trim().parse::<u32>() {
                        format.sample_rate = rate;
                    }
                }
            }
        }
        format
    }

    fn frame_len(&self) -> usize {
        self.channels as usize * self.sample_width as usize
    }

    fn check(&self, pcm_len: usize) -> Result<(), AudioError> {
        if self.channels == 0 {
            return Err(AudioError::InvalidFormat("channel count must be at least 1".into()));
        }
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidFormat("sample rate must be positive".into()));
        }
        if !(1..=4).contains(&self.sample_width) {
            return Err(AudioError::InvalidFormat(format!(
                "unsupported sample width: {} bytes",
                self.sample_width
            )));
        }
        if pcm_len % self.frame_len() != 0 {
            return Err(AudioError::MisalignedBuffer {
                len: pcm_len,
                frame: self.frame_len(),
            });
        }
        Ok(())
    }
}

/// Wraps raw PCM bytes in a WAV container.
/// Nothing is returned unless the whole buffer was written and finalized.
pub fn encode_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, AudioError> {
    format.check(pcm.len())?;

    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: format.sample_width * 8,
        sample_format: SampleFormat::Int,
    };

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    {
        let mut writer = WavWriter::new(Cursor::new(&mut out), spec)?;
        let width = format.sample_width as usize;
        for sample in pcm.chunks_exact(width) {
            match width {
                // 8-bit WAV is unsigned; hound takes signed and re-biases.
                1 => writer.write_sample((sample[0] as i16 - 128) as i8)?,
                2 => writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?,
                3 => {
                    // sign-extend 24-bit
                    let v = i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8;
                    writer.write_sample(v)?
                }
                _ => writer.write_sample(i32::from_le_bytes([
                    sample[0], sample[1], sample[2], sample[3],
                ]))?,
            }
        }
        writer.finalize()?;
    }

    debug!(
        "Encoded {} PCM bytes as WAV ({} ch, {} Hz, {}-bit)",
        pcm.len(),
        format.channels,
        format.sample_rate,
        format.sample_width * 8
    );
    Ok(out)
}

/// `encode_wav`, then base64 (standard alphabet, padded).
pub fn encode_wav_base64(pcm: &[u8], format: PcmFormat) -> Result<String, AudioError> {
    encode_wav(pcm, format).map(|bytes| STANDARD.encode(bytes))
}
