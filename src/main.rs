// src/main.rs

mod cli;

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use portal_client::config::Config;
use portal_client::handlers::{ExamSession, MyAssignments};
use portal_client::models::{
    assignment::filter_assignments, attempt::filter_attempts, blog::Author, question::AnswerValue,
};
use portal_client::report::{AssignmentStatus, sorted_attempts};
use portal_client::utils::html::render_safe;
use portal_client::{ApiClient, AppError, FileSessionStore, SessionContext};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if present)
    dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "portal.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    // Console logs go to stderr so command output stays clean.
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    let fallback = cli.command.failure_message();
    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message(fallback));
            if e.requires_login() {
                eprintln!("Sign in with `portal login <email> <password>`.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &Config) -> Result<(), AppError> {
    let session = SessionContext::new(Arc::new(FileSessionStore::new(&config.session_file)));
    session.restore().await?;
    let api = ApiClient::from_config(config, session.clone())?;

    match command {
        Command::Login { email, password } => {
            let session = api.login(&email, &password).await?;
            let name = session
                .profile
                .as_ref()
                .and_then(|p| p.display_name())
                .unwrap_or("employee");
            println!("Signed in as {name}{}", if session.is_admin() { " (admin)" } else { "" });
        }
        Command::Logout => {
            api.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match session.current().await {
            Some(current) => {
                let name = current
                    .profile
                    .as_ref()
                    .and_then(|p| p.display_name())
                    .unwrap_or("unknown");
                println!("{name}{}", if current.is_admin() { " (admin)" } else { "" });
            }
            None => println!("Not signed in"),
        },
        Command::Assignments { search } => {
            let needle = search.unwrap_or_default();
            if session.is_admin().await {
                let assignments = api.list_assignments().await?;
                for a in filter_assignments(&assignments, &needle) {
                    println!(
                        "{}  {}  ({} questions, {} marks, cutoff {})",
                        a.id,
                        a.title,
                        a.questions.len(),
                        a.computed_total_marks(),
                        a.cutoff
                    );
                }
            } else {
                let screen = MyAssignments::new(api.clone());
                screen.refresh().await?;
                let available = api.available_assignments().await?;
                let now = Utc::now();
                for a in filter_assignments(&available, &needle) {
                    println!(
                        "{}  {}  [{}]{}",
                        a.id,
                        a.title,
                        screen.status(&a.id).await.label(),
                        if a.is_past_due(now) { " (past due)" } else { "" }
                    );
                }
            }
        }
        Command::Report => {
            let screen = MyAssignments::new(api);
            screen.refresh().await?;
            let report = screen.report().await;
            if report.is_empty() {
                println!("No assignments yet");
            }
            for entry in report {
                let status = match entry.status() {
                    AssignmentStatus::NotAttempted => "Not attempted".to_string(),
                    AssignmentStatus::Passed { attempt_number, score } => {
                        format!("Passed on attempt {attempt_number} with {score}")
                    }
                    AssignmentStatus::Failed { attempt_number, score } => {
                        format!("Failed attempt {attempt_number} with {score}")
                    }
                };
                println!("{}  (cutoff {}): {}", entry.title, entry.cutoff, status);
                for attempt in sorted_attempts(&entry.attempts) {
                    let when = attempt
                        .submitted_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "    #{} {} {} {}",
                        attempt.attempt_number,
                        attempt.score,
                        if attempt.passed { "passed" } else { "failed" },
                        when
                    );
                }
            }
        }
        Command::Take { id, answers, dry_run } => {
            let raw = tokio::fs::read_to_string(&answers)
                .await
                .map_err(|e| AppError::Validation(format!("Cannot read {}: {e}", answers.display())))?;
            let answers: BTreeMap<String, AnswerValue> = serde_json::from_str(&raw)
                .map_err(|e| AppError::Validation(format!("Answers file is not valid JSON: {e}")))?;

            let mut exam = ExamSession::start(api, &id).await?;
            for (question_id, answer) in answers {
                exam.answer(&question_id, answer)?;
            }
            for q in exam.unanswered() {
                println!("Unanswered: {}", q.text);
            }
            println!("Progress: {}%", exam.progress());

            let result = if dry_run { exam.preview() } else { exam.submit().await? };
            println!(
                "Score {} of {}: {}",
                result.score,
                exam.assignment().computed_total_marks(),
                if result.passed { "passed" } else { "failed" }
            );
            if let Some(message) = result.message.as_deref() {
                println!("{message}");
            }
        }
        Command::Attempts { id, search, submissions } => {
            let attempts = if submissions {
                api.assignment_submissions(&id).await?
            } else {
                api.assignment_attempts(&id).await?
            };
            for t in filter_attempts(&attempts, search.as_deref().unwrap_or_default()) {
                let who = t.employee.as_ref().and_then(|e| e.id()).unwrap_or("-");
                println!(
                    "{}  #{}  {}  {}",
                    who,
                    t.attempt_number,
                    t.score,
                    if t.passed { "passed" } else { "failed" }
                );
            }
        }
        Command::Status { employee_id } => {
            let status = api.employee_status(&employee_id).await?;
            println!("Completed ({}):", status.completed_assignments.len());
            for a in &status.completed_assignments {
                println!("    {}", a.title);
            }
            println!("Remaining ({}):", status.remaining_assignments.len());
            for a in &status.remaining_assignments {
                println!("    {}", a.title);
            }
        }
        Command::Employees => {
            for e in api.list_employees().await? {
                println!(
                    "{}  {}  {}",
                    e.id.as_deref().unwrap_or("-"),
                    e.display_name().unwrap_or("-"),
                    e.designation.as_deref().unwrap_or_default()
                );
            }
        }
        Command::Blogs { slug } => {
            let profile = session.profile().await;
            match slug {
                Some(slug) => {
                    let blog = api.get_blog(&slug).await?;
                    println!("{}", blog.title);
                    println!("by {}", Author::display_name(blog.author.as_ref(), profile.as_ref()));
                    for block in blog.sorted_blocks() {
                        println!("\n{}", render_safe(block).content);
                    }
                }
                None => {
                    for blog in api.visible_blogs().await? {
                        println!(
                            "{}  {}  by {}{}",
                            blog.slug,
                            blog.title,
                            Author::display_name(blog.author.as_ref(), profile.as_ref()),
                            if blog.published { "" } else { " (draft)" }
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
