//! CLI argument parsing
//!
//! One subcommand per screening operation; query commands take the
//! username that owns the records they touch

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Voice-based Parkinson's disease screening
#[derive(Parser, Debug)]
#[command(name = "parkinsense")]
#[command(about = "Screen voice recordings and clinical measurements for Parkinson's disease")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen an audio recording (wav, mp3, webm, ogg)
    Detect {
        /// Audio file to screen
        audio: PathBuf,
        /// Username owning this screening
        #[arg(short, long)]
        user: String,
        /// Mark the input as a live recording instead of an upload
        #[arg(long)]
        recorded: bool,
    },
    /// Screen from the 22 biomedical voice measurements
    Values {
        /// Username owning this screening
        #[arg(short, long)]
        user: String,
        /// JSON file with the measurements (array, or object keyed by name)
        #[arg(long, conflicts_with = "values")]
        input: Option<PathBuf>,
        /// The 22 measurements inline, in canonical order
        #[arg(value_name = "VALUE", num_args = 0.., allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// List a user's screening history
    History {
        #[arg(short, long)]
        user: String,
        /// Maximum number of entries shown
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Show one screening in detail
    Show {
        /// Detection id
        id: i64,
        #[arg(short, long)]
        user: String,
    },
    /// Render a screening report
    Report {
        /// Detection id
        id: i64,
        #[arg(short, long)]
        user: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Export screening history as CSV
    Export {
        /// Restrict to one user (all users when omitted)
        #[arg(short, long)]
        user: Option<String>,
        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
    },
    /// Manage the hospital catalog
    Hospitals {
        #[command(subcommand)]
        action: HospitalsAction,
    },
    /// Manage user profiles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Overall usage counters
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum HospitalsAction {
    /// Seed the sample hospital catalog (no-op when already seeded)
    Init,
    /// List the catalog
    List,
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register a new user
    Add {
        username: String,
        /// Email address for screening reports
        #[arg(long)]
        email: String,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Update an existing profile (only the given fields change)
    Update {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Show a profile
    Show { username: String },
}

/// Optional profile fields shared by add and update
#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub age: Option<i64>,
    /// M, F, or O
    #[arg(long)]
    pub gender: Option<Gender>,
    #[arg(long)]
    pub medical_history: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Gender {
    M,
    F,
    O,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
            Gender::O => "O",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}
