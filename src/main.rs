// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Liftlog command-line client
//!
//! Logs in against the workout backend, keeps the session on disk between
//! runs and records workout sessions.

use clap::Parser;
use liftlog::{
    cli::{Cli, Commands, ExerciseArg},
    config::Config,
    error::{ActionResult, ClientError},
    models::{HistorySummary, SessionStats, SignupForm},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::from_env()?;
    tracing::debug!(api_url = %config.api_url, "Configuration loaded");
    let state = AppState::new(config)?;

    let result = run(&state, cli.command).await;
    if let Err(e) = &result {
        tracing::debug!(error = %e, "Command failed");
    }
    if let ActionResult {
        success: false,
        error,
    } = ActionResult::from(result)
    {
        eprintln!("{}", error.unwrap_or_default());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(state: &AppState, command: Commands) -> Result<(), ClientError> {
    let session = &state.session;

    match command {
        Commands::Health => {
            session.backend().health().await?;
            println!("Backend at {} is healthy", state.config.api_url);
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let user = session
                .register(SignupForm {
                    username,
                    email,
                    confirm_password: password.clone(),
                    password,
                })
                .await?;
            println!("Registered {} (id {}). You can now log in.", user.username, user.id);
        }
        Commands::Login { username, password } => {
            let user = session.login(&username, &password).await?;
            println!("Logged in as {}", user.username);
        }
        Commands::Logout => {
            session.logout(None);
            println!("Logged out");
        }
        Commands::Whoami => match session.restore().await {
            Some(user) => println!("{} (id {})", user.username, user.id),
            None => println!("Not logged in"),
        },
        Commands::History { summary } => {
            require_session(state).await?;
            let records = state.history.fetch().await?;
            if summary {
                let totals = HistorySummary::from_records(&records);
                println!(
                    "{} sessions, {} sets, {} reps, volume {:.1}, average {} min",
                    totals.sessions,
                    totals.total_sets,
                    totals.total_reps,
                    totals.total_volume,
                    totals.average_duration_secs() / 60
                );
            } else if records.is_empty() {
                println!("No sessions yet");
            } else {
                for record in &records {
                    let stats = SessionStats::from_record(record);
                    println!(
                        "#{} {}  {} exercises, {} sets, {} min  {}",
                        record.id,
                        record.started_at.format("%Y-%m-%d %H:%M"),
                        stats.exercises,
                        stats.total_sets,
                        stats.duration().num_minutes(),
                        record.notes.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Commands::Log { exercises, notes } => {
            require_session(state).await?;
            let mut tracker = state.workout_tracker();
            tracker.start()?;
            for ExerciseArg(form) in exercises {
                tracker.add_exercise(form.into_exercise()?)?;
            }
            if let Some(notes) = notes {
                tracker.set_notes(notes)?;
            }
            let record = tracker.end().await?;
            println!(
                "Saved session #{}: {}",
                record.id,
                record.notes.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

async fn require_session(state: &AppState) -> Result<(), ClientError> {
    if state.session.restore().await.is_some() {
        return Ok(());
    }
    Err(match state.session.take_notice() {
        Some(notice) => ClientError::Authentication(notice),
        None => ClientError::Authentication("Not logged in. Run `liftlog login` first.".to_string()),
    })
}

/// Initialize logging: human-readable by default, flattened JSON with `LOG_FORMAT=json`.
fn init_logging() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let format = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("liftlog=debug,info")),
        )
        .with(format)
        .init();
}
