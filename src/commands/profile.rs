//! Profile commands: user add, user update, user show

use super::CommandResult;
use crate::cli::ProfileArgs;
use crate::database::UserProfile;
use crate::detection::DetectionEngine;

fn to_profile(email: Option<String>, args: &ProfileArgs) -> UserProfile {
    UserProfile {
        email,
        first_name: args.first_name.clone(),
        last_name: args.last_name.clone(),
        phone: args.phone.clone(),
        address: args.address.clone(),
        city: args.city.clone(),
        state: args.state.clone(),
        country: args.country.clone(),
        age: args.age,
        gender: args.gender.map(|g| g.as_str().to_string()),
        medical_history: args.medical_history.clone(),
    }
}

/// Handle `user add <USERNAME> --email <EMAIL> [profile flags]`
pub fn handle_add(
    engine: &DetectionEngine,
    username: &str,
    email: String,
    args: &ProfileArgs,
) -> CommandResult {
    if engine.db().get_user(username)?.is_some() {
        return Err(format!("User '{}' already exists", username).into());
    }
    engine
        .db()
        .create_user(username, &to_profile(Some(email), args))?;
    println!("Registered user '{}'", username);
    Ok(())
}

/// Handle `user update <USERNAME> [flags]`
pub fn handle_update(
    engine: &DetectionEngine,
    username: &str,
    email: Option<String>,
    args: &ProfileArgs,
) -> CommandResult {
    engine.db().update_user(username, &to_profile(email, args))?;
    println!("Profile updated successfully!");
    Ok(())
}

/// Handle `user show <USERNAME>`
pub fn handle_show(engine: &DetectionEngine, username: &str) -> CommandResult {
    let user = engine.db().require_user(username)?;

    println!("Username:  {}", user.username);
    println!("Email:     {}", user.email);
    if !user.first_name.is_empty() || !user.last_name.is_empty() {
        println!("Name:      {} {}", user.first_name, user.last_name);
    }
    if let Some(phone) = &user.phone {
        println!("Phone:     {}", phone);
    }
    if let Some(address) = &user.address {
        println!("Address:   {}", address);
    }
    if let Some(city) = &user.city {
        println!("City:      {}", city);
    }
    if let Some(state) = &user.state {
        println!("State:     {}", state);
    }
    if let Some(country) = &user.country {
        println!("Country:   {}", country);
    }
    if let Some(age) = user.age {
        println!("Age:       {}", age);
    }
    if let Some(gender) = &user.gender {
        println!("Gender:    {}", gender);
    }
    if let Some(history) = &user.medical_history {
        println!("History:   {}", history);
    }
    println!("Member since {} (updated {})", user.created_at, user.updated_at);
    Ok(())
}
