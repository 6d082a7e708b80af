//! Test helper modules for platter-ap integration tests
//!
//! - audio_generator: deterministic WAV fixtures written with hound

#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{generate_pcm8_mono, generate_pcm16_stereo, generate_pcm24_mono};
