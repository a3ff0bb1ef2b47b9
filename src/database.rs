//! Database management for users, hospitals, and screening history
//!
//! Uses SQLite to persist every screening alongside hospital suggestions
//! and email report delivery status

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Lock error")]
    LockError,
    #[error("Unknown user: {0}")]
    UnknownUser(String),
}

/// SQL schema for all tables
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    phone TEXT,
    address TEXT,
    city TEXT,
    state TEXT,
    country TEXT,
    age INTEGER,
    gender TEXT,
    medical_history TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS hospitals (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL,
    specialization TEXT NOT NULL,
    rating REAL NOT NULL DEFAULT 4.5
);

CREATE INDEX IF NOT EXISTS idx_hospitals_rating ON hospitals(rating DESC);

CREATE TABLE IF NOT EXISTS detections (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    audio_path TEXT NOT NULL,
    result TEXT NOT NULL,
    confidence REAL NOT NULL,
    test_type TEXT NOT NULL,
    features_json TEXT NOT NULL DEFAULT '{}',
    test_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_detections_user ON detections(user_id, test_date DESC);

CREATE TABLE IF NOT EXISTS suggested_hospitals (
    id INTEGER PRIMARY KEY,
    detection_id INTEGER NOT NULL REFERENCES detections(id) ON DELETE CASCADE,
    hospital_id INTEGER NOT NULL REFERENCES hospitals(id) ON DELETE CASCADE,
    rank INTEGER NOT NULL,
    reason TEXT,
    added_at TEXT NOT NULL,
    UNIQUE(detection_id, hospital_id)
);

CREATE TABLE IF NOT EXISTS email_reports (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    detection_id INTEGER NOT NULL UNIQUE REFERENCES detections(id) ON DELETE CASCADE,
    recipient_email TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT,
    sent_at TEXT NOT NULL
);
"#;

/// Screening verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionResult {
    Healthy,
    Parkinson,
}

impl DetectionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionResult::Healthy => "healthy",
            DetectionResult::Parkinson => "parkinson",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(DetectionResult::Healthy),
            "parkinson" => Some(DetectionResult::Parkinson),
            _ => None,
        }
    }
}

/// How the audio (or feature set) reached the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestType {
    Upload,
    Record,
    Values,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Upload => "upload",
            TestType::Record => "record",
            TestType::Values => "values",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(TestType::Upload),
            "record" => Some(TestType::Record),
            "values" => Some(TestType::Values),
            _ => None,
        }
    }
}

/// Delivery status of an email report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Sent,
    Failed,
    Pending,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
            EmailStatus::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(EmailStatus::Sent),
            "failed" => Some(EmailStatus::Failed),
            "pending" => Some(EmailStatus::Pending),
            _ => None,
        }
    }
}

/// Registered user with profile details
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile fields accepted on user creation and update
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
}

/// Hospital catalog entry
#[derive(Debug, Clone)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    pub phone: String,
    pub email: String,
    pub specialization: String,
    pub rating: f64,
}

/// One screening in the history
#[derive(Debug, Clone)]
pub struct Detection {
    pub id: i64,
    pub user_id: i64,
    pub audio_path: String,
    pub result: DetectionResult,
    pub confidence: f64,
    pub test_type: TestType,
    pub features_json: String,
    pub test_date: String,
}

/// Hospital suggestion attached to a positive screening
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub rank: i64,
    pub reason: Option<String>,
    pub hospital: Hospital,
}

/// Recorded email report delivery
#[derive(Debug, Clone)]
pub struct EmailReport {
    pub id: i64,
    pub recipient_email: String,
    pub status: EmailStatus,
    pub error_message: Option<String>,
    pub sent_at: String,
}

/// Per-user screening counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionStats {
    pub total: i64,
    pub parkinson: i64,
    pub healthy: i64,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn hospital_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Hospital> {
    Ok(Hospital {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        lat: row.get(5)?,
        lon: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        specialization: row.get(9)?,
        rating: row.get(10)?,
    })
}

const HOSPITAL_COLS: &str = "id, name, address, city, state, lat, lon, phone, email, specialization, rating";

fn detection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Detection> {
    let result_str: String = row.get(3)?;
    let type_str: String = row.get(5)?;
    Ok(Detection {
        id: row.get(0)?,
        user_id: row.get(1)?,
        audio_path: row.get(2)?,
        result: DetectionResult::from_str(&result_str).unwrap_or(DetectionResult::Healthy),
        confidence: row.get(4)?,
        test_type: TestType::from_str(&type_str).unwrap_or(TestType::Upload),
        features_json: row.get(6)?,
        test_date: row.get(7)?,
    })
}

const DETECTION_COLS: &str =
    "id, user_id, audio_path, result, confidence, test_type, features_json, test_date";

/// Database connection wrapper
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Initialize database tables
    fn init(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ---- users ----

    /// Create a user with the given username (fails on duplicates)
    pub fn create_user(&self, username: &str, profile: &UserProfile) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let ts = now();
        conn.execute(
            "INSERT INTO users
             (username, email, first_name, last_name, phone, address, city, state,
              country, age, gender, medical_history, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                username,
                profile.email.as_deref().unwrap_or(""),
                profile.first_name.as_deref().unwrap_or(""),
                profile.last_name.as_deref().unwrap_or(""),
                profile.phone,
                profile.address,
                profile.city,
                profile.state,
                profile.country,
                profile.age,
                profile.gender,
                profile.medical_history,
                ts,
                ts,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Apply the non-empty fields of a profile update to an existing user
    pub fn update_user(&self, username: &str, profile: &UserProfile) -> Result<(), DatabaseError> {
        let current = self
            .get_user(username)?
            .ok_or_else(|| DatabaseError::UnknownUser(username.to_string()))?;

        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        conn.execute(
            "UPDATE users SET email = ?, first_name = ?, last_name = ?, phone = ?,
             address = ?, city = ?, state = ?, country = ?, age = ?, gender = ?,
             medical_history = ?, updated_at = ? WHERE id = ?",
            params![
                profile.email.clone().unwrap_or(current.email),
                profile.first_name.clone().unwrap_or(current.first_name),
                profile.last_name.clone().unwrap_or(current.last_name),
                profile.phone.clone().or(current.phone),
                profile.address.clone().or(current.address),
                profile.city.clone().or(current.city),
                profile.state.clone().or(current.state),
                profile.country.clone().or(current.country),
                profile.age.or(current.age),
                profile.gender.clone().or(current.gender),
                profile.medical_history.clone().or(current.medical_history),
                now(),
                current.id,
            ],
        )?;
        Ok(())
    }

    /// Look up a user by username
    pub fn get_user(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(
            "SELECT id, username, email, first_name, last_name, phone, address, city,
                    state, country, age, gender, medical_history, created_at, updated_at
             FROM users WHERE username = ?",
        )?;
        let user = stmt
            .query_row([username], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    phone: row.get(5)?,
                    address: row.get(6)?,
                    city: row.get(7)?,
                    state: row.get(8)?,
                    country: row.get(9)?,
                    age: row.get(10)?,
                    gender: row.get(11)?,
                    medical_history: row.get(12)?,
                    created_at: row.get(13)?,
                    updated_at: row.get(14)?,
                })
            })
            .optional()?;
        Ok(user)
    }

    /// Require a user by username
    pub fn require_user(&self, username: &str) -> Result<User, DatabaseError> {
        self.get_user(username)?
            .ok_or_else(|| DatabaseError::UnknownUser(username.to_string()))
    }

    /// Total registered users
    pub fn user_count(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ---- hospitals ----

    /// Insert a hospital catalog entry
    pub fn insert_hospital(&self, hospital: &Hospital) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        conn.execute(
            "INSERT INTO hospitals
             (name, address, city, state, lat, lon, phone, email, specialization, rating)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                hospital.name,
                hospital.address,
                hospital.city,
                hospital.state,
                hospital.lat,
                hospital.lon,
                hospital.phone,
                hospital.email,
                hospital.specialization,
                hospital.rating,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of hospitals in the catalog
    pub fn hospital_count(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let count = conn.query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))?;
        Ok(count)
    }

    /// All hospitals ordered by name
    pub fn list_hospitals(&self) -> Result<Vec<Hospital>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOSPITAL_COLS} FROM hospitals ORDER BY name"
        ))?;
        let rows = stmt.query_map([], hospital_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Highest-rated hospitals, best first
    pub fn top_hospitals(&self, limit: u32) -> Result<Vec<Hospital>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOSPITAL_COLS} FROM hospitals ORDER BY rating DESC LIMIT ?"
        ))?;
        let rows = stmt.query_map([limit], hospital_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Random sample of hospitals for display alongside a positive result
    pub fn random_hospitals(&self, limit: u32) -> Result<Vec<Hospital>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOSPITAL_COLS} FROM hospitals ORDER BY RANDOM() LIMIT ?"
        ))?;
        let rows = stmt.query_map([limit], hospital_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- detections ----

    /// Record a screening; returns the new detection id
    pub fn insert_detection(
        &self,
        user_id: i64,
        audio_path: &str,
        result: DetectionResult,
        confidence: f64,
        test_type: TestType,
        features_json: &str,
    ) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        conn.execute(
            "INSERT INTO detections
             (user_id, audio_path, result, confidence, test_type, features_json, test_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                audio_path,
                result.as_str(),
                confidence,
                test_type.as_str(),
                features_json,
                now(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch a screening, scoped to its owner
    pub fn get_detection(
        &self,
        detection_id: i64,
        user_id: i64,
    ) -> Result<Option<Detection>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DETECTION_COLS} FROM detections WHERE id = ? AND user_id = ?"
        ))?;
        let detection = stmt
            .query_row(params![detection_id, user_id], detection_from_row)
            .optional()?;
        Ok(detection)
    }

    /// A user's screenings, newest first
    pub fn list_detections(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<Detection>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DETECTION_COLS} FROM detections
             WHERE user_id = ? ORDER BY test_date DESC LIMIT ?"
        ))?;
        let rows = stmt.query_map(params![user_id, limit], detection_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All screenings across users with their owner's username, newest first
    pub fn list_all_detections(&self) -> Result<Vec<(String, Detection)>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(
            "SELECT u.username, d.id, d.user_id, d.audio_path, d.result, d.confidence,
                    d.test_type, d.features_json, d.test_date
             FROM detections d
             JOIN users u ON u.id = d.user_id
             ORDER BY d.test_date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let username: String = row.get(0)?;
            let result_str: String = row.get(4)?;
            let type_str: String = row.get(6)?;
            Ok((
                username,
                Detection {
                    id: row.get(1)?,
                    user_id: row.get(2)?,
                    audio_path: row.get(3)?,
                    result: DetectionResult::from_str(&result_str)
                        .unwrap_or(DetectionResult::Healthy),
                    confidence: row.get(5)?,
                    test_type: TestType::from_str(&type_str).unwrap_or(TestType::Upload),
                    features_json: row.get(7)?,
                    test_date: row.get(8)?,
                },
            ))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Total screenings recorded
    pub fn detection_count(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let count = conn.query_row("SELECT COUNT(*) FROM detections", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Per-user screening counters
    pub fn detection_stats(&self, user_id: i64) -> Result<DetectionStats, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let (total, parkinson): (i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN result = 'parkinson' THEN 1 ELSE 0 END), 0)
             FROM detections WHERE user_id = ?",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DetectionStats {
            total,
            parkinson,
            healthy: total - parkinson,
        })
    }

    // ---- hospital suggestions ----

    /// Attach a ranked hospital suggestion to a screening
    pub fn insert_suggestion(
        &self,
        detection_id: i64,
        hospital_id: i64,
        rank: i64,
        reason: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        conn.execute(
            "INSERT OR IGNORE INTO suggested_hospitals
             (detection_id, hospital_id, rank, reason, added_at)
             VALUES (?, ?, ?, ?, ?)",
            params![detection_id, hospital_id, rank, reason, now()],
        )?;
        Ok(())
    }

    /// Suggestions for a screening, ordered by rank
    pub fn suggestions_for(&self, detection_id: i64) -> Result<Vec<Suggestion>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(
            "SELECT s.rank, s.reason,
                    h.id, h.name, h.address, h.city, h.state, h.lat, h.lon,
                    h.phone, h.email, h.specialization, h.rating
             FROM suggested_hospitals s
             JOIN hospitals h ON h.id = s.hospital_id
             WHERE s.detection_id = ?
             ORDER BY s.rank",
        )?;
        let rows = stmt.query_map([detection_id], |row| {
            Ok(Suggestion {
                rank: row.get(0)?,
                reason: row.get(1)?,
                hospital: Hospital {
                    id: row.get(2)?,
                    name: row.get(3)?,
                    address: row.get(4)?,
                    city: row.get(5)?,
                    state: row.get(6)?,
                    lat: row.get(7)?,
                    lon: row.get(8)?,
                    phone: row.get(9)?,
                    email: row.get(10)?,
                    specialization: row.get(11)?,
                    rating: row.get(12)?,
                },
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ---- email reports ----

    /// Record the delivery outcome of a screening report email
    pub fn insert_email_report(
        &self,
        user_id: i64,
        detection_id: i64,
        recipient_email: &str,
        status: EmailStatus,
        error_message: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        conn.execute(
            "INSERT INTO email_reports
             (user_id, detection_id, recipient_email, status, error_message, sent_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                detection_id,
                recipient_email,
                status.as_str(),
                error_message,
                now(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Email report for a screening, if one was recorded
    pub fn email_report_for(
        &self,
        detection_id: i64,
    ) -> Result<Option<EmailReport>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockError)?;
        let mut stmt = conn.prepare(
            "SELECT id, recipient_email, status, error_message, sent_at
             FROM email_reports WHERE detection_id = ?",
        )?;
        let report = stmt
            .query_row([detection_id], |row| {
                let status_str: String = row.get(2)?;
                Ok(EmailReport {
                    id: row.get(0)?,
                    recipient_email: row.get(1)?,
                    status: EmailStatus::from_str(&status_str).unwrap_or(EmailStatus::Pending),
                    error_message: row.get(3)?,
                    sent_at: row.get(4)?,
                })
            })
            .optional()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hospital(name: &str, rating: f64) -> Hospital {
        Hospital {
            id: 0,
            name: name.to_string(),
            address: "1 Street".to_string(),
            city: "City".to_string(),
            state: "State".to_string(),
            lat: 0.0,
            lon: 0.0,
            phone: "000".to_string(),
            email: "h@example.com".to_string(),
            specialization: "Neurology".to_string(),
            rating,
        }
    }

    #[test]
    fn test_user_roundtrip() {
        let db = Database::open(":memory:").unwrap();

        let profile = UserProfile {
            email: Some("alice@example.com".to_string()),
            first_name: Some("Alice".to_string()),
            city: Some("Delhi".to_string()),
            age: Some(61),
            ..Default::default()
        };
        db.create_user("alice", &profile).unwrap();

        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.first_name, "Alice");
        assert_eq!(user.age, Some(61));

        // Partial update leaves other fields untouched
        let update = UserProfile {
            city: Some("Mumbai".to_string()),
            ..Default::default()
        };
        db.update_user("alice", &update).unwrap();
        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.city.as_deref(), Some("Mumbai"));
        assert_eq!(user.email, "alice@example.com");

        assert!(db.get_user("nobody").unwrap().is_none());
        assert!(matches!(
            db.require_user("nobody"),
            Err(DatabaseError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_hospital_ordering() {
        let db = Database::open(":memory:").unwrap();
        db.insert_hospital(&test_hospital("Beta", 4.2)).unwrap();
        db.insert_hospital(&test_hospital("Alpha", 4.9)).unwrap();
        db.insert_hospital(&test_hospital("Gamma", 4.5)).unwrap();

        assert_eq!(db.hospital_count().unwrap(), 3);

        let by_name = db.list_hospitals().unwrap();
        assert_eq!(by_name[0].name, "Alpha");
        assert_eq!(by_name[2].name, "Gamma");

        let top = db.top_hospitals(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Alpha");
        assert_eq!(top[1].name, "Gamma");

        let sample = db.random_hospitals(10).unwrap();
        assert_eq!(sample.len(), 3);
    }

    #[test]
    fn test_detection_flow() {
        let db = Database::open(":memory:").unwrap();
        let user_id = db.create_user("bob", &UserProfile::default()).unwrap();
        let hospital_id = db.insert_hospital(&test_hospital("Alpha", 4.9)).unwrap();

        let detection_id = db
            .insert_detection(
                user_id,
                "media/sample.wav",
                DetectionResult::Parkinson,
                81.5,
                TestType::Upload,
                "{\"features\":[]}",
            )
            .unwrap();

        let detection = db.get_detection(detection_id, user_id).unwrap().unwrap();
        assert_eq!(detection.result, DetectionResult::Parkinson);
        assert_eq!(detection.test_type, TestType::Upload);

        // Scoped fetch: another user cannot see it
        let other_id = db.create_user("carol", &UserProfile::default()).unwrap();
        assert!(db.get_detection(detection_id, other_id).unwrap().is_none());

        db.insert_suggestion(detection_id, hospital_id, 1, Some("top rated"))
            .unwrap();
        // Duplicate (detection, hospital) pairs are ignored
        db.insert_suggestion(detection_id, hospital_id, 2, None)
            .unwrap();
        let suggestions = db.suggestions_for(detection_id).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].rank, 1);
        assert_eq!(suggestions[0].hospital.name, "Alpha");

        db.insert_detection(
            user_id,
            "media/other.wav",
            DetectionResult::Healthy,
            40.0,
            TestType::Record,
            "{}",
        )
        .unwrap();

        let stats = db.detection_stats(user_id).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.parkinson, 1);
        assert_eq!(stats.healthy, 1);

        let history = db.list_detections(user_id, 10).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_email_report_roundtrip() {
        let db = Database::open(":memory:").unwrap();
        let user_id = db.create_user("dan", &UserProfile::default()).unwrap();
        let detection_id = db
            .insert_detection(
                user_id,
                "media/a.wav",
                DetectionResult::Healthy,
                12.0,
                TestType::Upload,
                "{}",
            )
            .unwrap();

        assert!(db.email_report_for(detection_id).unwrap().is_none());

        db.insert_email_report(
            user_id,
            detection_id,
            "dan@example.com",
            EmailStatus::Failed,
            Some("connection refused"),
        )
        .unwrap();

        let report = db.email_report_for(detection_id).unwrap().unwrap();
        assert_eq!(report.status, EmailStatus::Failed);
        assert_eq!(report.error_message.as_deref(), Some("connection refused"));
    }
}
