// src/cli.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Command-line client for the company portal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login { email: String, password: String },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// List assignments (all of them for admins, available ones otherwise)
    Assignments {
        /// Case-insensitive filter on title and description
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show my attempts and the current status of each assignment
    Report,
    /// Take an assignment, answering from a JSON file
    Take {
        /// Assignment id
        id: String,
        /// JSON object mapping question id to an answer (string or list)
        #[arg(short, long)]
        answers: PathBuf,
        /// Grade locally without submitting
        #[arg(long)]
        dry_run: bool,
    },
    /// Attempts for one assignment (admin)
    Attempts {
        id: String,
        #[arg(short, long)]
        search: Option<String>,
        /// Read the submissions view instead of the attempts list
        #[arg(long)]
        submissions: bool,
    },
    /// Completed and remaining assignments of an employee (admin)
    Status { employee_id: String },
    /// List employees
    Employees,
    /// List blogs, or show one by slug
    Blogs {
        #[arg(short, long)]
        slug: Option<String>,
    },
}

impl Command {
    /// Notification shown when the backend gives no message of its own.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Command::Login { .. } => "Login failed",
            Command::Logout | Command::Whoami => "Session error",
            Command::Assignments { .. } => "Failed to load assignments",
            Command::Report => "Failed to load report",
            Command::Take { .. } => "Submit failed",
            Command::Attempts { .. } => "Failed to load attempts",
            Command::Status { .. } => "Failed to load employee status",
            Command::Employees => "Failed to load employees",
            Command::Blogs { .. } => "Failed to load blogs",
        }
    }
}
