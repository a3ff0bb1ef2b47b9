//! Screening commands: detect (audio) and values (clinical measurements)

use std::path::Path;
use tracing::error;

use super::CommandResult;
use crate::audio::AudioConverter;
use crate::database::{EmailStatus, TestType};
use crate::detection::{DetectionEngine, ScreeningOutcome};
use crate::model::CLINICAL_FEATURE_NAMES;

/// Handle `detect <AUDIO> --user <NAME> [--recorded]`
pub async fn handle_detect(
    engine: &DetectionEngine,
    audio: &Path,
    user: &str,
    recorded: bool,
) -> CommandResult {
    if !AudioConverter::is_supported(audio) {
        return Err("The audio file format is not supported. Please use MP3 or WAV.".into());
    }

    let test_type = if recorded {
        TestType::Record
    } else {
        TestType::Upload
    };

    match engine.screen_audio(user, audio, test_type).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            error!("Error in audio screening: {}", e);
            Err(e.user_message().into())
        }
    }
}

/// Handle `values --user <NAME> (--input FILE | 22 floats)`
pub async fn handle_values(
    engine: &DetectionEngine,
    user: &str,
    input: Option<&Path>,
    inline: &[f64],
) -> CommandResult {
    let values = match input {
        Some(path) => read_values_file(path)?,
        None => {
            if inline.len() != CLINICAL_FEATURE_NAMES.len() {
                return Err(format!(
                    "expected {} measurements, got {}",
                    CLINICAL_FEATURE_NAMES.len(),
                    inline.len()
                )
                .into());
            }
            inline.to_vec()
        }
    };

    match engine.screen_values(user, &values).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            error!("Error in values screening: {}", e);
            Err(e.user_message().into())
        }
    }
}

/// Read the 22 measurements from JSON: a bare array in canonical order,
/// or an object keyed by feature name
fn read_values_file(path: &Path) -> Result<Vec<f64>, Box<dyn std::error::Error + Send + Sync>> {
    let raw = std::fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;

    match parsed {
        serde_json::Value::Array(items) => {
            if items.len() != CLINICAL_FEATURE_NAMES.len() {
                return Err(format!(
                    "expected {} measurements, got {}",
                    CLINICAL_FEATURE_NAMES.len(),
                    items.len()
                )
                .into());
            }
            items
                .iter()
                .map(|v| {
                    v.as_f64()
                        .ok_or_else(|| format!("non-numeric measurement: {}", v).into())
                })
                .collect()
        }
        serde_json::Value::Object(map) => CLINICAL_FEATURE_NAMES
            .iter()
            .map(|name| {
                map.get(*name)
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| format!("Invalid value for {}", name).into())
            })
            .collect(),
        _ => Err("measurements file must be a JSON array or object".into()),
    }
}

fn print_outcome(outcome: &ScreeningOutcome) {
    let label = match outcome.result {
        crate::database::DetectionResult::Parkinson => "Parkinson Detected",
        crate::database::DetectionResult::Healthy => "Healthy",
    };

    println!("Result:     {}", label);
    println!("Confidence: {:.2}%", outcome.confidence);
    println!("Detection:  #{}", outcome.detection_id);
    if !outcome.used_model {
        println!("Note:       heuristic fallback was used (no trained model)");
    }

    match outcome.email {
        EmailStatus::Sent => println!("Detection completed. Report sent to your email!"),
        EmailStatus::Pending => println!("Detection completed. Email reporting is not configured."),
        EmailStatus::Failed => println!("Detection completed. Report email could not be delivered."),
    }

    if !outcome.hospitals.is_empty() {
        println!("\nRecommended hospitals:");
        for hospital in &outcome.hospitals {
            println!(
                "  - {} ({}), {}, rating {:.1}",
                hospital.name, hospital.specialization, hospital.phone, hospital.rating
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_file_as_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        let values: Vec<f64> = (0..22).map(|i| i as f64).collect();
        std::fs::write(&path, serde_json::to_string(&values).unwrap()).unwrap();

        let parsed = read_values_file(&path).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_values_file_as_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        let mut map = serde_json::Map::new();
        for (i, name) in CLINICAL_FEATURE_NAMES.iter().enumerate() {
            map.insert(name.to_string(), serde_json::json!(i as f64 * 0.5));
        }
        std::fs::write(&path, serde_json::Value::Object(map).to_string()).unwrap();

        let parsed = read_values_file(&path).unwrap();
        assert_eq!(parsed.len(), 22);
        assert_eq!(parsed[0], 0.0);
        assert_eq!(parsed[21], 10.5);
    }

    #[test]
    fn test_values_file_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, r#"{"MDVP:Fo(Hz)": 119.992}"#).unwrap();

        let err = read_values_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid value for"));
    }

    #[test]
    fn test_values_file_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, "[1.0, 2.0]").unwrap();

        let err = read_values_file(&path).unwrap_err();
        assert!(err.to_string().contains("expected 22"));
    }
}
