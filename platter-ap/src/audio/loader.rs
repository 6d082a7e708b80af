//! WAV loading using symphonia
//!
//! Decodes a whole waveform file up front and hands back its layout plus the
//! raw interleaved PCM bytes, ready to be uploaded into a sound buffer.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, info, warn};

/// A fully decoded waveform.
///
/// `data` holds interleaved little-endian samples in the file's own width:
/// 8-bit unsigned, 16/24/32-bit signed integer, or 32-bit float.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveData {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate: u32,
    pub data: Vec<u8>,
}

impl WaveData {
    /// Size of the PCM payload in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Number of frames in the payload
    pub fn frames(&self) -> usize {
        let frame_size = self.channels as usize * (self.bits_per_sample as usize / 8);
        if frame_size == 0 {
            0
        } else {
            self.data.len() / frame_size
        }
    }
}

/// Waveform loader backed by symphonia's WAV reader and PCM codec.
pub struct WaveLoader;

impl WaveLoader {
    /// Decode the entire file at `path`.
    ///
    /// # Errors
    /// - Failed to open or probe the file
    /// - No audio track, or the track lacks a sample rate / channel layout
    /// - Fewer sample bytes than the header declares, or a read error
    ///   before the end of the stream (short read)
    /// - The file contains no samples
    pub fn load(path: &Path) -> Result<WaveData> {
        debug!("Loading waveform: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut data = Vec::new();
        let mut decoded_bits = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    break;
                }
                Err(e) => {
                    return Err(Error::Decode(format!(
                        "Short read after {} bytes: {}",
                        data.len(),
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    decoded_bits = Some(Self::append_pcm_bytes(&decoded, &mut data)?);
                }
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Decode failed: {}", e)));
                }
            }
        }

        let bits_per_sample = codec_params
            .bits_per_sample
            .map(|bits| bits as u16)
            .or(decoded_bits)
            .ok_or_else(|| Error::Decode("No audio samples decoded".to_string()))?;

        if data.is_empty() {
            return Err(Error::Decode("No audio samples decoded".to_string()));
        }

        // The container declares its frame count; a data chunk that ends
        // early still decodes cleanly up to the cut, so compare sizes
        if let Some(declared_frames) = codec_params.n_frames {
            let frame_bytes = u64::from(channels) * u64::from(bits_per_sample / 8);
            let want = declared_frames * frame_bytes;
            if (data.len() as u64) < want {
                return Err(Error::Decode(format!(
                    "Short read: got {} bytes, want {}",
                    data.len(),
                    want
                )));
            }
        }

        let wave = WaveData {
            channels,
            bits_per_sample,
            sample_rate,
            data,
        };

        info!(
            "Loaded {}: {} channel(s), {} bits, {} Hz, {} bytes",
            path.display(),
            wave.channels,
            wave.bits_per_sample,
            wave.sample_rate,
            wave.data_size()
        );

        Ok(wave)
    }

    /// Append one decoded packet as raw interleaved bytes.
    ///
    /// Returns the bit width the samples were written with.
    fn append_pcm_bytes(decoded: &AudioBufferRef, output: &mut Vec<u8>) -> Result<u16> {
        match decoded {
            AudioBufferRef::U8(buf) => {
                Self::interleave(&**buf, output, |s, out| out.push(s));
                Ok(8)
            }
            AudioBufferRef::S16(buf) => {
                Self::interleave(&**buf, output, |s, out| out.extend_from_slice(&s.to_le_bytes()));
                Ok(16)
            }
            AudioBufferRef::S24(buf) => {
                // i24 is carried in an i32; keep the low three bytes
                Self::interleave(&**buf, output, |s, out| {
                    out.extend_from_slice(&s.inner().to_le_bytes()[..3])
                });
                Ok(24)
            }
            AudioBufferRef::S32(buf) => {
                Self::interleave(&**buf, output, |s, out| out.extend_from_slice(&s.to_le_bytes()));
                Ok(32)
            }
            AudioBufferRef::F32(buf) => {
                Self::interleave(&**buf, output, |s, out| out.extend_from_slice(&s.to_le_bytes()));
                Ok(32)
            }
            _ => Err(Error::Decode(
                "Unsupported sample type in waveform".to_string(),
            )),
        }
    }

    /// Interleave a planar symphonia buffer, writing each sample with `write`.
    fn interleave<S, F>(buf: &AudioBuffer<S>, output: &mut Vec<u8>, write: F)
    where
        S: Sample,
        F: Fn(S, &mut Vec<u8>),
    {
        let num_channels = buf.spec().channels.count();

        for frame_idx in 0..buf.frames() {
            for ch_idx in 0..num_channels {
                write(buf.chan(ch_idx)[frame_idx], output);
            }
        }
    }
}
