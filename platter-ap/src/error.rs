//! Error types for platter-ap
//!
//! Every variant is fatal at setup time; once the control loop runs,
//! nothing in it returns an error.

use thiserror::Error;

/// Main error type for platter-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Waveform loading errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Channel/bit-depth combination with no PCM format mapping
    #[error("Unsupported PCM layout: {channels} channel(s), {bits_per_sample} bits per sample")]
    UnsupportedFormat { channels: u16, bits_per_sample: u16 },

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Pulse input device errors
    #[error("Pulse input error: {0}")]
    Input(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<platter_common::Error> for Error {
    fn from(err: platter_common::Error) -> Self {
        match err {
            platter_common::Error::Io(e) => Error::Io(e),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using platter-ap Error
pub type Result<T> = std::result::Result<T, Error>;
