//! Test helpers for waveloop-player integration tests
//!
//! - audio_generator: deterministic WAV fixtures written with hound

#![allow(dead_code)]

pub mod audio_generator;
