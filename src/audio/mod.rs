//! Audio module for normalization, decoding, and feature extraction
//!
//! Inputs in any supported container are normalized to mono 22.05 kHz PCM
//! WAV before acoustic features are computed

pub mod converter;
pub mod features;
pub mod wave;

pub use converter::AudioConverter;
pub use features::FeatureExtractor;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),
    #[error("ffmpeg is not available: {0}")]
    FfmpegMissing(String),
    #[error("ffmpeg conversion failed for {0}")]
    ConversionFailed(PathBuf),
    #[error("Audio contains no samples")]
    Empty,
}
