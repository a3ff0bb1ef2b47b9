//! Screening orchestration
//!
//! Runs the full pipeline for one screening: normalize audio, extract
//! features, classify, persist the detection, attach hospital suggestions
//! on a positive result, and dispatch the email report.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::audio::{wave, AudioConverter, AudioError, FeatureExtractor};
use crate::config::{thresholds, Config};
use crate::database::{
    Database, DatabaseError, DetectionResult, EmailStatus, Hospital, TestType, User,
};
use crate::hospitals;
use crate::mailer::{HttpMailer, MailMessage, MailTransport, MailerError};
use crate::model::{Detector, ModelError};
use crate::report::Report;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Mailer error: {0}")]
    Mailer(#[from] MailerError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DetectionError {
    /// Message safe to show a patient; the underlying error goes to the log
    pub fn user_message(&self) -> &'static str {
        match self {
            DetectionError::Model(_) => {
                "Audio processing system is initializing. Please try again in a moment."
            }
            DetectionError::Audio(AudioError::FfmpegMissing(_))
            | DetectionError::Audio(AudioError::ConversionFailed(_)) => {
                "Audio conversion service is not available. Please try again."
            }
            DetectionError::Audio(_) => {
                "The audio file format is not supported. Please use MP3 or WAV."
            }
            DetectionError::Database(DatabaseError::UnknownUser(_)) => {
                "Unknown user. Register a profile first with `user add`."
            }
            _ => "Error processing audio. Please try again with a different file.",
        }
    }
}

/// Result of one screening, as returned to the caller
#[derive(Debug)]
pub struct ScreeningOutcome {
    pub detection_id: i64,
    pub result: DetectionResult,
    pub confidence: f64,
    pub probability: f64,
    pub used_model: bool,
    pub email: EmailStatus,
    /// Display sample of hospitals; populated only on a positive result
    pub hospitals: Vec<Hospital>,
}

/// The screening engine: owns the database, detectors, and mail transport
pub struct DetectionEngine {
    config: Config,
    db: Arc<Database>,
    audio_detector: Detector,
    values_detector: Detector,
    converter: AudioConverter,
    extractor: FeatureExtractor,
    mailer: Option<Box<dyn MailTransport>>,
}

impl DetectionEngine {
    /// Build the engine from configuration, opening the database and
    /// loading whatever model artifacts exist
    pub fn new(config: Config) -> Result<Self, DetectionError> {
        let db = Arc::new(Database::open(&config.database_path)?);
        let mailer: Option<Box<dyn MailTransport>> = match &config.mail {
            Some(mail) => Some(Box::new(HttpMailer::new(mail)?)),
            None => None,
        };
        Self::assemble(config, db, mailer)
    }

    /// Assemble from pre-built parts (tests inject their own)
    pub fn assemble(
        config: Config,
        db: Arc<Database>,
        mailer: Option<Box<dyn MailTransport>>,
    ) -> Result<Self, DetectionError> {
        let audio_detector = Detector::load(
            &config.model_dir,
            "audio_model.json",
            "audio_scaler.json",
            thresholds::AUDIO,
            "audio",
        )?;
        let values_detector = Detector::load(
            &config.model_dir,
            "values_model.json",
            "values_scaler.json",
            thresholds::VALUES,
            "clinical values",
        )?;
        let converter = AudioConverter::new(config.ffmpeg_path.clone(), config.sample_rate);
        let extractor = FeatureExtractor::new(config.sample_rate);

        Ok(Self {
            config,
            db,
            audio_detector,
            values_detector,
            converter,
            extractor,
            mailer,
        })
    }

    /// Shared database handle for query-only commands
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Whether the audio classifier has trained artifacts (vs the heuristic)
    pub fn audio_model_loaded(&self) -> bool {
        self.audio_detector.has_model()
    }

    /// Whether the clinical-values classifier is available
    pub fn values_model_loaded(&self) -> bool {
        self.values_detector.has_model()
    }

    /// Run an audio screening for a registered user
    pub async fn screen_audio(
        &self,
        username: &str,
        input: &Path,
        test_type: TestType,
    ) -> Result<ScreeningOutcome, DetectionError> {
        let user = self.db.require_user(username)?;

        let (wav_path, temp) = self
            .converter
            .normalize(input, &self.config.media_dir)
            .await?;

        let features = wave::load_samples(
            &wav_path,
            self.config.sample_rate,
            self.config.max_duration_secs,
        )
        .map(|samples| self.extractor.extract(&samples));

        // The normalized copy is only needed for extraction
        if let Some(temp) = temp {
            AudioConverter::cleanup_files(&[temp]);
        }
        let features = features?;

        let prediction = self.audio_detector.predict(&features);
        if !prediction.used_model {
            info!("Using fallback detection (audio model not available)");
        }

        let features_json = serde_json::to_string(&serde_json::json!({
            "features": features,
        }))?;

        self.record_outcome(
            &user,
            &input.to_string_lossy(),
            test_type,
            prediction.probability,
            prediction.confidence,
            prediction.is_positive,
            prediction.used_model,
            &features_json,
        )
        .await
    }

    /// Run a clinical-values screening from the 22 biomedical measurements
    pub async fn screen_values(
        &self,
        username: &str,
        values: &[f64],
    ) -> Result<ScreeningOutcome, DetectionError> {
        let user = self.db.require_user(username)?;

        let prediction = self.values_detector.predict_strict(values)?;

        let features_json = serde_json::to_string(&serde_json::json!({
            "features": values,
            "feature_names": crate::model::CLINICAL_FEATURE_NAMES,
            "raw_probability": prediction.probability,
        }))?;

        let audio_path = format!("values_test_{}.txt", user.id);
        self.record_outcome(
            &user,
            &audio_path,
            TestType::Values,
            prediction.probability,
            prediction.confidence,
            prediction.is_positive,
            prediction.used_model,
            &features_json,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_outcome(
        &self,
        user: &User,
        audio_path: &str,
        test_type: TestType,
        probability: f64,
        confidence: f64,
        is_positive: bool,
        used_model: bool,
        features_json: &str,
    ) -> Result<ScreeningOutcome, DetectionError> {
        let result = if is_positive {
            DetectionResult::Parkinson
        } else {
            DetectionResult::Healthy
        };

        let detection_id = self.db.insert_detection(
            user.id,
            audio_path,
            result,
            confidence,
            test_type,
            features_json,
        )?;
        info!(
            "Recorded {} screening #{} for {} ({:.2}%)",
            result.as_str(),
            detection_id,
            user.username,
            confidence
        );

        // Hospitals are only suggested on a positive result
        if is_positive {
            hospitals::suggest_for_detection(&self.db, detection_id)?;
        }

        let email = self.dispatch_report(user, detection_id).await?;

        let display_hospitals = if is_positive {
            self.db.random_hospitals(hospitals::SUGGESTION_LIMIT)?
        } else {
            Vec::new()
        };

        Ok(ScreeningOutcome {
            detection_id,
            result,
            confidence,
            probability,
            used_model,
            email,
            hospitals: display_hospitals,
        })
    }

    /// Send the report email and record the delivery outcome
    ///
    /// Delivery problems never fail the screening; they are logged and
    /// recorded in the email_reports table.
    async fn dispatch_report(
        &self,
        user: &User,
        detection_id: i64,
    ) -> Result<EmailStatus, DetectionError> {
        let detection = match self.db.get_detection(detection_id, user.id)? {
            Some(d) => d,
            None => return Ok(EmailStatus::Pending),
        };
        let suggestions = self.db.suggestions_for(detection_id)?;
        let report = Report::build(user, &detection, &suggestions);

        let status = if user.email.is_empty() {
            warn!("User {} has no email address on file", user.username);
            self.db.insert_email_report(
                detection.user_id,
                detection_id,
                "",
                EmailStatus::Failed,
                Some("no recipient email address"),
            )?;
            EmailStatus::Failed
        } else {
            match &self.mailer {
                None => {
                    warn!("Mail transport not configured, report left pending");
                    self.db.insert_email_report(
                        detection.user_id,
                        detection_id,
                        &user.email,
                        EmailStatus::Pending,
                        None,
                    )?;
                    EmailStatus::Pending
                }
                Some(mailer) => {
                    let message = MailMessage {
                        to: user.email.clone(),
                        subject: report.subject(),
                        text: report.to_text(),
                    };
                    match mailer.send(&message).await {
                        Ok(()) => {
                            self.db.insert_email_report(
                                detection.user_id,
                                detection_id,
                                &user.email,
                                EmailStatus::Sent,
                                None,
                            )?;
                            EmailStatus::Sent
                        }
                        Err(e) => {
                            error!("Error sending email report: {}", e);
                            self.db.insert_email_report(
                                detection.user_id,
                                detection_id,
                                &user.email,
                                EmailStatus::Failed,
                                Some(&e.to_string()),
                            )?;
                            EmailStatus::Failed
                        }
                    }
                }
            }
        };

        Ok(status)
    }
}
