//! Core audio data types
//!
//! Defines the PCM layouts the player accepts, the sound buffer that holds
//! the whole waveform in RAM, and the stereo frame handed to the output
//! device.

use crate::error::{Error, Result};

/// One of the four canonical PCM layouts a sound buffer can be uploaded in.
///
/// **Byte layout (interleaved, little-endian):**
/// - 8-bit samples are unsigned, 128 = silence
/// - 16-bit samples are signed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmFormat {
    Mono8,
    Mono16,
    Stereo8,
    Stereo16,
}

impl PcmFormat {
    /// Map a channel count and bit depth to a PCM format.
    ///
    /// Any channel count above one is treated as stereo. Bit depths other
    /// than 8 and 16 have no mapping and yield `None`.
    pub fn from_layout(channels: u16, bits_per_sample: u16) -> Option<Self> {
        let stereo = channels > 1;

        match (bits_per_sample, stereo) {
            (16, true) => Some(PcmFormat::Stereo16),
            (16, false) => Some(PcmFormat::Mono16),
            (8, true) => Some(PcmFormat::Stereo8),
            (8, false) => Some(PcmFormat::Mono8),
            _ => None,
        }
    }

    /// Number of interleaved channels
    pub fn channels(self) -> u16 {
        match self {
            PcmFormat::Mono8 | PcmFormat::Mono16 => 1,
            PcmFormat::Stereo8 | PcmFormat::Stereo16 => 2,
        }
    }

    /// Bits per individual sample
    pub fn bits_per_sample(self) -> u16 {
        match self {
            PcmFormat::Mono8 | PcmFormat::Stereo8 => 8,
            PcmFormat::Mono16 | PcmFormat::Stereo16 => 16,
        }
    }

    /// Bytes per interleaved frame (all channels)
    pub fn frame_size(self) -> usize {
        self.channels() as usize * (self.bits_per_sample() as usize / 8)
    }
}

/// SoundBuffer holds an entire waveform as normalized f32 samples.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Interleaved by channel: mono `[M, M, ...]`, stereo `[L, R, L, R, ...]`
#[derive(Debug, Clone)]
pub struct SoundBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SoundBuffer {
    /// Upload raw PCM bytes in the given format.
    ///
    /// # Errors
    /// - `sample_rate` is zero
    /// - `bytes` is not a whole number of frames
    pub fn from_pcm(format: PcmFormat, bytes: &[u8], sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::Decode("Sample rate must be non-zero".to_string()));
        }

        let frame_size = format.frame_size();
        if bytes.len() % frame_size != 0 {
            return Err(Error::Decode(format!(
                "PCM data length {} is not a multiple of the {:?} frame size {}",
                bytes.len(),
                format,
                frame_size
            )));
        }

        let samples: Vec<f32> = match format.bits_per_sample() {
            8 => bytes.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
            _ => bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
                .collect(),
        };

        Ok(Self {
            samples,
            channels: format.channels(),
            sample_rate,
        })
    }

    /// Build a buffer from already-normalized interleaved samples.
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_samples(mut samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);

        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        (self.frames() as u64 * 1000)
            .checked_div(self.sample_rate as u64)
            .unwrap_or(0)
    }

    /// Get the frame at `index`; mono is duplicated to both sides.
    pub fn frame(&self, index: usize) -> Option<AudioFrame> {
        let channels = self.channels as usize;
        let start = index.checked_mul(channels)?;
        let frame = self.samples.get(start..start.checked_add(channels)?)?;

        Some(match frame {
            [mono] => AudioFrame::from_stereo(*mono, *mono),
            [left, right, ..] => AudioFrame::from_stereo(*left, *right),
            [] => AudioFrame::zero(),
        })
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between the source and the output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Linear interpolation between `self` (t = 0) and `next` (t = 1)
    pub fn lerp(self, next: AudioFrame, t: f32) -> AudioFrame {
        AudioFrame {
            left: self.left + (next.left - self.left) * t,
            right: self.right + (next.right - self.right) * t,
        }
    }

    /// Scale both channels by `gain`
    pub fn apply_volume(&mut self, gain: f32) {
        self.left *= gain;
        self.right *= gain;
    }
}
