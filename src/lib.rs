//! `wavchop` splits long recordings into chunks at sustained silences.
//!
//! Typical use is a continuous live recording that should become one file per track.
//!
//! This crate provides:
//! - Loudness sampling over fixed windows (`sampler`)
//! - Edge-detecting segmentation with a minimum-length filter (`segmenter`)
//! - Container/codec decoding into an in-memory `Signal` (`decoder`)
//! - WAV export with a run log and JSON manifest (`export`)
//! - Chunk listings as text, JSON, or CUE sheets
//!
//! Sampling and segmentation are pure and never fail; everything that touches files or
//! codecs returns [`Result`].

// High-level API (most consumers should start here).
pub mod chopper;
pub mod opts;

// Analysis core.
pub mod chunk;
pub mod sampler;
pub mod segmenter;
pub mod signal;

// Decoding.
pub mod audio_pipeline;
pub mod decode;
pub mod decoder;
pub mod demux;

// Output: files on disk and chunk listings.
pub mod chunk_encoder;
pub mod cue_encoder;
pub mod export;
pub mod json_array_encoder;
pub mod output_type;

// Configuration file.
pub mod settings;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use crate::error::{Error, Result};
