//! # Platter Audio Player Library (platter-ap)
//!
//! Plays one looping waveform and bends its pitch from pulses read off a
//! serial rotary sensor, like a hand nudging a turntable platter.
//!
//! **Architecture:** symphonia (WAV load) + rubato (rate match) + cpal
//! (output), with a tokio-driven speed control loop fed by a blocking
//! reader thread on the pulse device.

pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod input;

pub use error::{Error, Result};
