//! parkinsense
//!
//! Voice-based Parkinson's disease screening: acoustic feature extraction,
//! gradient-boosted classification, hospital suggestions, and email reports.

mod audio;
mod cli;
mod commands;
mod config;
mod database;
mod detection;
mod export;
mod hospitals;
mod mailer;
mod model;
mod report;

use clap::Parser;
use cli::{Cli, Command, HospitalsAction, UserAction};
use config::Config;
use detection::DetectionEngine;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,parkinsense=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Create media directory for conversion artifacts
    if let Err(e) = std::fs::create_dir_all(&config.media_dir) {
        error!("Failed to create media directory: {}", e);
        std::process::exit(1);
    }

    let engine = match DetectionEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to initialize engine: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Detect {
            audio,
            user,
            recorded,
        } => commands::screen::handle_detect(&engine, &audio, &user, recorded).await,
        Command::Values {
            user,
            input,
            values,
        } => commands::screen::handle_values(&engine, &user, input.as_deref(), &values).await,
        Command::History { user, limit } => commands::history::handle_history(&engine, &user, limit),
        Command::Show { id, user } => commands::history::handle_show(&engine, id, &user),
        Command::Report {
            id,
            user,
            out,
            format,
        } => commands::export::handle_report(&engine, id, &user, out.as_deref(), format),
        Command::Export { user, out } => {
            commands::export::handle_export(&engine, user.as_deref(), &out)
        }
        Command::Hospitals { action } => match action {
            HospitalsAction::Init => commands::hospitals::handle_init(&engine),
            HospitalsAction::List => commands::hospitals::handle_list(&engine),
        },
        Command::User { action } => match action {
            UserAction::Add {
                username,
                email,
                profile,
            } => commands::profile::handle_add(&engine, &username, email, &profile),
            UserAction::Update {
                username,
                email,
                profile,
            } => commands::profile::handle_update(&engine, &username, email, &profile),
            UserAction::Show { username } => commands::profile::handle_show(&engine, &username),
        },
        Command::Stats => commands::history::handle_stats(&engine),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
