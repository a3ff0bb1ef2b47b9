//! History commands: history, show, stats

use super::CommandResult;
use crate::detection::DetectionEngine;

/// Handle `history --user <NAME> [--limit N]`
pub fn handle_history(engine: &DetectionEngine, user: &str, limit: u32) -> CommandResult {
    let db = engine.db();
    let user = db.require_user(user)?;
    let stats = db.detection_stats(user.id)?;
    let detections = db.list_detections(user.id, limit)?;

    println!(
        "Screening history for {} ({} total, {} parkinson, {} healthy)",
        user.username, stats.total, stats.parkinson, stats.healthy
    );

    if detections.is_empty() {
        println!("No screenings recorded yet.");
        return Ok(());
    }

    println!(
        "{:<6} {:<28} {:<8} {:<10} {:>10}",
        "ID", "Date", "Type", "Result", "Confidence"
    );
    for d in &detections {
        println!(
            "{:<6} {:<28} {:<8} {:<10} {:>9.2}%",
            d.id,
            d.test_date,
            d.test_type.as_str(),
            d.result.as_str(),
            d.confidence
        );
    }

    Ok(())
}

/// Handle `show <ID> --user <NAME>`
pub fn handle_show(engine: &DetectionEngine, id: i64, user: &str) -> CommandResult {
    let db = engine.db();
    let user = db.require_user(user)?;

    let detection = match db.get_detection(id, user.id)? {
        Some(d) => d,
        None => return Err(format!("No screening #{} for {}", id, user.username).into()),
    };

    println!("Screening #{}", detection.id);
    println!("Date:       {}", detection.test_date);
    println!("Type:       {}", detection.test_type.as_str());
    println!("Result:     {}", detection.result.as_str());
    println!("Confidence: {:.2}%", detection.confidence);
    println!("Audio:      {}", detection.audio_path);

    if let Ok(payload) = serde_json::from_str::<serde_json::Value>(&detection.features_json) {
        if let Some(features) = payload["features"].as_array() {
            let preview: Vec<String> = features
                .iter()
                .take(6)
                .filter_map(|v| v.as_f64())
                .map(|v| format!("{:.4}", v))
                .collect();
            println!("Features:   {} extracted [{} ...]", features.len(), preview.join(", "));
        }
    }

    let suggestions = db.suggestions_for(detection.id)?;
    if !suggestions.is_empty() {
        println!("\nSuggested hospitals:");
        for s in &suggestions {
            print!(
                "  {}. {} ({}), {}",
                s.rank, s.hospital.name, s.hospital.specialization, s.hospital.phone
            );
            if let Some(reason) = &s.reason {
                print!(" - {}", reason);
            }
            println!();
        }
    }

    match db.email_report_for(detection.id)? {
        Some(report) => {
            print!(
                "\nEmail report #{}: {} to {}",
                report.id,
                report.status.as_str(),
                report.recipient_email
            );
            if let Some(error) = &report.error_message {
                print!(" ({})", error);
            }
            println!(" at {}", report.sent_at);
        }
        None => println!("\nEmail report: none"),
    }

    Ok(())
}

/// Handle `stats`
pub fn handle_stats(engine: &DetectionEngine) -> CommandResult {
    let db = engine.db();
    println!("Total screenings: {}", db.detection_count()?);
    println!("Registered users: {}", db.user_count()?);
    println!("Hospitals:        {}", db.hospital_count()?);
    println!(
        "Audio model:      {}",
        if engine.audio_model_loaded() {
            "loaded"
        } else {
            "fallback heuristic"
        }
    );
    println!(
        "Values model:     {}",
        if engine.values_model_loaded() {
            "loaded"
        } else {
            "not available"
        }
    );
    Ok(())
}
