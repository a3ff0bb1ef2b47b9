//! Configuration management for parkinsense
//!
//! Loads settings from environment variables (.env file)

use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Mail API credentials; absent when email reporting is disabled
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// HTTP mail API endpoint
    pub api_url: String,
    /// Bearer token for the mail API
    pub api_key: String,
    /// From address on outgoing reports
    pub from_address: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path
    pub database_path: PathBuf,
    /// Directory holding model/scaler JSON artifacts
    pub model_dir: PathBuf,
    /// Directory for temporary audio files
    pub media_dir: PathBuf,
    /// ffmpeg binary used for audio normalization
    pub ffmpeg_path: String,
    /// Analysis sample rate (feature extraction runs at 22.05 kHz)
    pub sample_rate: u32,
    /// Maximum seconds of audio analyzed per screening
    pub max_duration_secs: u32,
    /// Mail API settings, if configured
    pub mail: Option<MailConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_path = env::var("PARKINSENSE_DB")
            .unwrap_or_else(|_| "parkinsense.db".to_string())
            .into();

        let model_dir = env::var("MODEL_DIR")
            .unwrap_or_else(|_| "models".to_string())
            .into();

        let media_dir = env::var("MEDIA_DIR")
            .unwrap_or_else(|_| "media".to_string())
            .into();

        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());

        // Analysis rate is fixed at 22.05 kHz unless explicitly overridden;
        // trained model artifacts assume the default
        let sample_rate = env::var("PARKINSENSE_SAMPLE_RATE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .ok()
                    .filter(|r| *r > 0)
                    .ok_or_else(|| ConfigError::InvalidValue("PARKINSENSE_SAMPLE_RATE".to_string(), s))
            })
            .transpose()?
            .unwrap_or(22050);

        // Mail is optional: endpoint and key enable it, MAIL_FROM must follow
        let mail = match (
            env::var("MAIL_API_URL").ok().filter(|s| !s.is_empty()),
            env::var("MAIL_API_KEY").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(api_url), Some(api_key)) => {
                let from_address = env::var("MAIL_FROM")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ConfigError::MissingEnvVar("MAIL_FROM".to_string()))?;
                Some(MailConfig {
                    api_url,
                    api_key,
                    from_address,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_path,
            model_dir,
            media_dir,
            ffmpeg_path,
            sample_rate,
            max_duration_secs: 30,
            mail,
        })
    }
}

/// Decision thresholds for the two screening modes
pub mod thresholds {
    /// Audio screenings flag Parkinson's above this probability
    pub const AUDIO: f64 = 0.65;
    /// Clinical-values screenings use a stricter cutoff
    pub const VALUES: f64 = 0.75;
}
