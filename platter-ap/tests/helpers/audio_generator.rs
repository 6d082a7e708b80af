//! WAV fixture generation
//!
//! Each generator writes a short file with known sample values so loader
//! tests can check the decoded bytes exactly.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Standard test sample rate (44.1 kHz)
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Write 8-bit mono samples.
///
/// hound stores 8-bit WAV as unsigned, so `0` lands on disk as `128`.
pub fn generate_pcm8_mono<P: AsRef<Path>>(path: P, samples: &[i8]) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Write `frames` frames of 16-bit stereo: left ramps up, right is its negation.
pub fn generate_pcm16_stereo<P: AsRef<Path>>(path: P, frames: usize) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for i in 0..frames {
        let value = (i % 1000) as i16 * 16;
        writer.write_sample(value)?;
        writer.write_sample(-value)?;
    }
    writer.finalize()
}

/// Write `frames` frames of silent 24-bit mono.
pub fn generate_pcm24_mono<P: AsRef<Path>>(path: P, frames: usize) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 24,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frames {
        writer.write_sample(0i32)?;
    }
    writer.finalize()
}
