//! Litera CLI - line-oriented front end for the session sync engine.
//!
//! # Architecture
//!
//! The CLI resolves [`Settings`] (flags, environment, `~/.litera/config.toml`),
//! builds an [`HttpScoringService`], and drives a [`SyncEngine`] from stdin:
//!
//! ```text
//! main() -> Settings::resolve() -> SyncEngine::new(HttpScoringService)
//!                                        |
//!                                        v
//!                   read line -> commands::parse() -> engine call -> render
//! ```
//!
//! Logs go to a file, never to the terminal.

mod commands;
mod render;

use std::{
    fs::{self, OpenOptions},
    future::Future,
    io::Write,
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use litera_client::HttpScoringService;
use litera_config::{LiteraConfig, Overrides, Settings};
use litera_engine::litera_types::SessionIdentity;
use litera_engine::{CallKind, CallOutcome, Refusal, RequestSeq, SyncEngine};

use crate::commands::{Command, HELP};

#[derive(Debug, Parser)]
#[command(name = "litera", version, about = "Play Litera against a scoring service")]
struct Cli {
    /// Scoring service base URL (overrides LITERA_BACKEND_URL and the config file).
    #[arg(long, value_name = "URL")]
    backend: Option<String>,

    /// Session identifier to resume.
    #[arg(long, value_name = "ID")]
    session: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            backend_url: self.backend.clone(),
            request_timeout_secs: self.timeout_secs,
            session_id: self.session.clone(),
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_litera_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: drop logs rather than interleave them with the game output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_litera_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in litera_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn litera_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.litera/logs/litera.log
    if let Some(config_path) = LiteraConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("litera.log"));
    }

    // Fallback: ./.litera/logs/litera.log
    candidates.push(PathBuf::from(".litera").join("logs").join("litera.log"));

    candidates
}

fn load_config() -> Option<LiteraConfig> {
    match LiteraConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable config; using defaults");
            eprintln!("warning: {e}; using defaults");
            None
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Print the engine state after a call, or why nothing was sent.
fn report(engine: &SyncEngine<HttpScoringService>, outcome: &CallOutcome) {
    match outcome {
        CallOutcome::Refused(Refusal::Busy { .. }) => {
            println!("Busy: wait for the current request to finish.");
        }
        CallOutcome::Refused(Refusal::NoSession) => {
            if let Some(status) = engine.status() {
                println!("{status}");
            }
        }
        CallOutcome::Applied { .. }
        | CallOutcome::Rejected { .. }
        | CallOutcome::TransportFailed { .. } => {
            print!("{}", render::view(&engine.view()));
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}

/// Show the pending status of an issued call, then wait for it to settle.
///
/// Returns `None` if `interrupt` fires first; the call is still in flight and
/// is aborted when the engine is dropped.
async fn drive(
    engine: &mut SyncEngine<HttpScoringService>,
    kind: CallKind,
    issued: Result<RequestSeq, Refusal>,
    out: &mut impl Write,
    interrupt: impl Future<Output = ()>,
) -> Option<CallOutcome> {
    if let Err(refusal) = issued {
        return Some(CallOutcome::Refused(refusal));
    }
    if let Some(status) = engine.status().filter(|status| status.is_pending()) {
        let _ = writeln!(out, "{status}");
        let _ = out.flush();
    }

    tokio::select! {
        outcome = engine.settle() => {
            Some(outcome.unwrap_or_else(|| CallOutcome::TransportFailed {
                kind,
                error: "call vanished before settling".to_string(),
            }))
        }
        () = interrupt => {
            tracing::info!(%kind, "Interrupted with a call in flight");
            None
        }
    }
}

async fn run(engine: &mut SyncEngine<HttpScoringService>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    prompt();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            () = interrupted() => {
                tracing::info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            println!();
            return Ok(());
        };

        match commands::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => return Ok(()),
            Ok(Some(Command::Help)) => println!("{HELP}"),
            Ok(Some(Command::Scenarios)) => print!("{}", render::scenarios()),
            Ok(Some(Command::Show)) => print!("{}", render::view(&engine.view())),
            Ok(Some(Command::SetId(value))) => {
                engine.set_identifier(value);
                println!("Session id: {}", engine.identifier());
            }
            Ok(Some(Command::Start(identifier))) => {
                let issued = engine.issue_start(identifier);
                let stdout = &mut std::io::stdout();
                let Some(outcome) =
                    drive(engine, CallKind::StartSession, issued, stdout, interrupted()).await
                else {
                    println!();
                    return Ok(());
                };
                report(engine, &outcome);
            }
            Ok(Some(Command::Act(action))) => {
                let issued = engine.issue_action(action);
                let stdout = &mut std::io::stdout();
                let Some(outcome) =
                    drive(engine, CallKind::SubmitAction, issued, stdout, interrupted()).await
                else {
                    println!();
                    return Ok(());
                };
                report(engine, &outcome);
            }
            Err(e) => println!("{e}"),
        }
        prompt();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config();
    let settings = Settings::resolve(config.as_ref(), &cli.overrides())
        .context("invalid backend configuration")?;
    tracing::info!(
        backend = %settings.backend_url,
        timeout_secs = settings.request_timeout.as_secs(),
        "Settings resolved"
    );

    let service = HttpScoringService::new(settings.backend_url.clone(), settings.request_timeout)
        .context("failed to build HTTP client")?;

    let identity = match settings.session_id {
        Some(id) => {
            let mut identity = SessionIdentity::new();
            identity.set(id);
            identity
        }
        None => SessionIdentity::generated(),
    };

    // The engine's own bound sits just above the HTTP timeout so reqwest reports it first.
    let mut engine = SyncEngine::new(service, identity)
        .with_request_timeout(settings.request_timeout + Duration::from_secs(1));

    println!("Litera - backend {}", settings.backend_url);
    println!("Session id: {}", engine.identifier());

    run(&mut engine).await
}
