//! Screening report rendering
//!
//! Builds the text report sent by email and written by the `report`
//! command, plus a JSON form for machine consumption

use serde::Serialize;

use crate::database::{Detection, DetectionResult, Suggestion, User};

/// Hospital line in a rendered report
#[derive(Debug, Clone, Serialize)]
pub struct ReportHospital {
    pub rank: i64,
    pub name: String,
    pub specialization: String,
    pub phone: String,
    pub rating: f64,
}

/// A fully assembled screening report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub detection_id: i64,
    pub patient_name: String,
    pub patient_email: String,
    pub report_date: String,
    pub result: String,
    pub result_label: String,
    pub confidence: f64,
    pub test_type: String,
    pub hospitals: Vec<ReportHospital>,
}

impl Report {
    /// Assemble a report from a screening and its suggestions
    pub fn build(user: &User, detection: &Detection, suggestions: &[Suggestion]) -> Self {
        let patient_name = match (user.first_name.is_empty(), user.last_name.is_empty()) {
            (true, true) => user.username.clone(),
            _ => format!("{} {}", user.first_name, user.last_name)
                .trim()
                .to_string(),
        };

        Self {
            detection_id: detection.id,
            patient_name,
            patient_email: user.email.clone(),
            report_date: detection.test_date.clone(),
            result: detection.result.as_str().to_string(),
            result_label: result_label(detection.result).to_string(),
            confidence: detection.confidence,
            test_type: detection.test_type.as_str().to_string(),
            hospitals: suggestions
                .iter()
                .map(|s| ReportHospital {
                    rank: s.rank,
                    name: s.hospital.name.clone(),
                    specialization: s.hospital.specialization.clone(),
                    phone: s.hospital.phone.clone(),
                    rating: s.hospital.rating,
                })
                .collect(),
        }
    }

    /// Email subject line for this report
    pub fn subject(&self) -> String {
        format!("Parkinson Detection Report - {}", human_date(&self.report_date))
    }

    /// Plain-text rendering (email body and `report --format text`)
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("========================================\n");
        out.push_str("       PARKINSON DETECTION REPORT\n");
        out.push_str("========================================\n\n");
        out.push_str(&format!("Name:        {}\n", self.patient_name));
        out.push_str(&format!("Email:       {}\n", self.patient_email));
        out.push_str(&format!("Report Date: {}\n\n", human_date(&self.report_date)));
        out.push_str(&format!("Detection Result: {}\n", self.result_label));
        out.push_str(&format!("Confidence: {:.2}%\n", self.confidence));

        if !self.hospitals.is_empty() {
            out.push_str("\nRecommended Hospitals\n");
            out.push_str(&format!(
                "{:<5} {:<38} {}\n",
                "Rank", "Hospital", "Specialization"
            ));
            for h in &self.hospitals {
                out.push_str(&format!(
                    "{:<5} {:<38} {}\n",
                    h.rank, h.name, h.specialization
                ));
            }
        }

        out
    }

    /// Pretty JSON rendering (`report --format json`)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn result_label(result: DetectionResult) -> &'static str {
    match result {
        DetectionResult::Parkinson => "Parkinson Detected",
        DetectionResult::Healthy => "Healthy",
    }
}

/// Format an RFC 3339 timestamp as "08 August 2026", passing through
/// anything that fails to parse
fn human_date(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%d %B %Y").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Hospital, TestType};

    fn test_user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            phone: None,
            address: None,
            city: None,
            state: None,
            country: None,
            age: None,
            gender: None,
            medical_history: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn test_detection(result: DetectionResult) -> Detection {
        Detection {
            id: 7,
            user_id: 1,
            audio_path: "media/a.wav".to_string(),
            result,
            confidence: 81.25,
            test_type: TestType::Upload,
            features_json: "{}".to_string(),
            test_date: "2026-08-08T10:30:00+00:00".to_string(),
        }
    }

    fn test_suggestion(rank: i64, name: &str) -> Suggestion {
        Suggestion {
            rank,
            reason: None,
            hospital: Hospital {
                id: rank,
                name: name.to_string(),
                address: String::new(),
                city: String::new(),
                state: String::new(),
                lat: 0.0,
                lon: 0.0,
                phone: "000".to_string(),
                email: String::new(),
                specialization: "Neurology".to_string(),
                rating: 4.9,
            },
        }
    }

    #[test]
    fn test_positive_report_text() {
        let report = Report::build(
            &test_user(),
            &test_detection(DetectionResult::Parkinson),
            &[test_suggestion(1, "AIIMS Delhi")],
        );

        let text = report.to_text();
        assert!(text.contains("Alice Smith"));
        assert!(text.contains("Detection Result: Parkinson Detected"));
        assert!(text.contains("Confidence: 81.25%"));
        assert!(text.contains("AIIMS Delhi"));
        assert!(text.contains("08 August 2026"));

        assert_eq!(report.subject(), "Parkinson Detection Report - 08 August 2026");
    }

    #[test]
    fn test_healthy_report_omits_hospitals() {
        let report = Report::build(&test_user(), &test_detection(DetectionResult::Healthy), &[]);
        let text = report.to_text();
        assert!(text.contains("Detection Result: Healthy"));
        assert!(!text.contains("Recommended Hospitals"));
    }

    #[test]
    fn test_username_stands_in_for_empty_name() {
        let mut user = test_user();
        user.first_name.clear();
        user.last_name.clear();
        let report = Report::build(&user, &test_detection(DetectionResult::Healthy), &[]);
        assert_eq!(report.patient_name, "alice");
    }

    #[test]
    fn test_json_rendering() {
        let report = Report::build(
            &test_user(),
            &test_detection(DetectionResult::Parkinson),
            &[test_suggestion(1, "AIIMS Delhi")],
        );
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["result"], "parkinson");
        assert_eq!(value["hospitals"][0]["name"], "AIIMS Delhi");
    }
}
