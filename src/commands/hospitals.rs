//! Hospital catalog commands: init, list

use super::CommandResult;
use crate::detection::DetectionEngine;
use crate::hospitals;

/// Handle `hospitals init`
pub fn handle_init(engine: &DetectionEngine) -> CommandResult {
    let created = hospitals::seed(engine.db())?;
    if created == 0 {
        println!("Hospitals already exist");
    } else {
        println!("Created {} hospitals", created);
    }
    Ok(())
}

/// Handle `hospitals list`
pub fn handle_list(engine: &DetectionEngine) -> CommandResult {
    let hospitals = engine.db().list_hospitals()?;
    if hospitals.is_empty() {
        println!("No hospitals in the catalog. Run `hospitals init` first.");
        return Ok(());
    }

    println!(
        "{:<38} {:<12} {:<36} {:>6}",
        "Name", "City", "Specialization", "Rating"
    );
    for h in &hospitals {
        println!(
            "{:<38} {:<12} {:<36} {:>6.1}",
            h.name, h.city, h.specialization, h.rating
        );
    }
    Ok(())
}
