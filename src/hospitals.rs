//! Hospital catalog seeding and recommendation
//!
//! Positive screenings get the top-rated hospitals attached as ranked
//! suggestions; the seed catalog mirrors the deployment's initial data

use tracing::info;

use crate::database::{Database, DatabaseError, Hospital};

/// Default number of hospitals suggested per positive screening
pub const SUGGESTION_LIMIT: u32 = 10;

const SUGGESTION_REASON: &str = "Closest and highest-rated facility for Parkinson support";

fn entry(
    name: &str,
    address: &str,
    city: &str,
    state: &str,
    lat: f64,
    lon: f64,
    phone: &str,
    email: &str,
    specialization: &str,
    rating: f64,
) -> Hospital {
    Hospital {
        id: 0,
        name: name.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        lat,
        lon,
        phone: phone.to_string(),
        email: email.to_string(),
        specialization: specialization.to_string(),
        rating,
    }
}

/// Initial hospital catalog
pub fn sample_hospitals() -> Vec<Hospital> {
    vec![
        entry(
            "Rainbow Hospital",
            "123 Medical Street",
            "New Delhi",
            "Delhi",
            28.6139,
            77.2090,
            "+91-11-234567890",
            "info@rainbowhospital.com",
            "Neurology & Parkinson Care",
            4.8,
        ),
        entry(
            "Max Healthcare",
            "456 Health Avenue",
            "New Delhi",
            "Delhi",
            28.5244,
            77.1855,
            "+91-11-345678901",
            "info@maxhealthcare.com",
            "Advanced Neurological Center",
            4.7,
        ),
        entry(
            "Apollo Hospital",
            "789 Care Plaza",
            "New Delhi",
            "Delhi",
            28.5505,
            77.3026,
            "+91-11-456789012",
            "info@apollohospital.com",
            "Neurology Department",
            4.6,
        ),
        entry(
            "Fortis Hospital",
            "321 Medicare Lane",
            "Bangalore",
            "Karnataka",
            12.9716,
            77.5946,
            "+91-80-567890123",
            "info@fortishealthcare.com",
            "Neurological Disorders",
            4.5,
        ),
        entry(
            "Manipal Hospital",
            "654 Health Street",
            "Bangalore",
            "Karnataka",
            13.0084,
            77.5867,
            "+91-80-678901234",
            "info@manipalhospital.com",
            "Movement Disorder Clinic",
            4.6,
        ),
        entry(
            "Lilavati Hospital",
            "987 Wellness Road",
            "Mumbai",
            "Maharashtra",
            19.0176,
            72.8298,
            "+91-22-789012345",
            "info@lilavati.com",
            "Neurology & Rehabilitation",
            4.7,
        ),
        entry(
            "HCG Hospital",
            "111 Medical Complex",
            "Bangalore",
            "Karnataka",
            12.9394,
            77.6245,
            "+91-80-890123456",
            "info@hcgfoundation.com",
            "Neuro Care Center",
            4.5,
        ),
        entry(
            "Government Medical College Hospital",
            "222 Medical District",
            "Chandigarh",
            "Chandigarh",
            30.7333,
            76.7794,
            "+91-172-901234567",
            "info@gmch.edu.in",
            "Neurology Department",
            4.4,
        ),
        entry(
            "AIIMS Delhi",
            "333 Institute Road",
            "New Delhi",
            "Delhi",
            28.5677,
            77.2082,
            "+91-11-012345678",
            "info@aiims.edu",
            "Movement Disorders Unit",
            4.9,
        ),
        entry(
            "Institute of Neurology",
            "444 Research Park",
            "Mumbai",
            "Maharashtra",
            19.0760,
            72.8777,
            "+91-22-012345678",
            "info@neuro-institute.com",
            "Parkinson Disease Research Center",
            4.8,
        ),
    ]
}

/// Seed the hospital catalog, refusing when hospitals already exist
///
/// Returns the number of hospitals created (0 when already seeded)
pub fn seed(db: &Database) -> Result<usize, DatabaseError> {
    if db.hospital_count()? > 0 {
        info!("Hospitals already exist, skipping seed");
        return Ok(0);
    }

    let hospitals = sample_hospitals();
    for hospital in &hospitals {
        db.insert_hospital(hospital)?;
    }
    info!("Seeded {} hospitals", hospitals.len());
    Ok(hospitals.len())
}

/// Attach the top-rated hospitals to a positive screening, ranked 1..n
pub fn suggest_for_detection(db: &Database, detection_id: i64) -> Result<usize, DatabaseError> {
    let hospitals = db.top_hospitals(SUGGESTION_LIMIT)?;
    for (rank, hospital) in hospitals.iter().enumerate() {
        db.insert_suggestion(
            detection_id,
            hospital.id,
            rank as i64 + 1,
            Some(SUGGESTION_REASON),
        )?;
    }
    Ok(hospitals.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DetectionResult, TestType, UserProfile};

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open(":memory:").unwrap();
        assert_eq!(seed(&db).unwrap(), 10);
        assert_eq!(seed(&db).unwrap(), 0);
        assert_eq!(db.hospital_count().unwrap(), 10);
    }

    #[test]
    fn test_suggestions_are_ranked_by_rating() {
        let db = Database::open(":memory:").unwrap();
        seed(&db).unwrap();

        let user_id = db.create_user("eve", &UserProfile::default()).unwrap();
        let detection_id = db
            .insert_detection(
                user_id,
                "media/x.wav",
                DetectionResult::Parkinson,
                90.0,
                TestType::Upload,
                "{}",
            )
            .unwrap();

        let count = suggest_for_detection(&db, detection_id).unwrap();
        assert_eq!(count, 10);

        let suggestions = db.suggestions_for(detection_id).unwrap();
        assert_eq!(suggestions.len(), 10);
        assert_eq!(suggestions[0].rank, 1);
        // AIIMS Delhi carries the highest rating in the seed catalog
        assert_eq!(suggestions[0].hospital.name, "AIIMS Delhi");
        for pair in suggestions.windows(2) {
            assert!(pair[0].hospital.rating >= pair[1].hospital.rating);
        }
    }
}
