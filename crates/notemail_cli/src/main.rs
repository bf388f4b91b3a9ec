//! notemail command-line entry point.
//!
//! # Responsibility
//! - Load configuration, initialize logging and run the watcher + HTTP
//!   service until Ctrl-C.
//! - Offer offline helpers: note checking, the note template and the ledger
//!   listing.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use notemail_core::config::{default_ledger_path, ENV_DB_PATH};
use notemail_core::http::{self, AppState};
use notemail_core::{
    init_logging, parse_note, Config, DeliveryPipeline, FileAnnotator, Ledger, Mailer,
    NoteService, SmtpMailer, SqliteLedger, NOTE_TEMPLATE,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "notemail", version, about = "Mail complete notes from a watched folder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the notes folder and serve the HTTP API (default).
    Run,
    /// Parse one note and report whether it would be sent.
    Check { file: PathBuf },
    /// Print the note format.
    Format,
    /// List notes already delivered.
    Processed {
        /// Ledger database file; defaults to DB_PATH or the install directory.
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_service().await,
        Command::Check { file } => check_note(&file),
        Command::Format => {
            println!("{NOTE_TEMPLATE}");
            Ok(())
        }
        Command::Processed { db } => list_processed(db),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_service() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_logging(config.log_level, &config.log_dir).context("failed to initialize logging")?;

    let ledger = SqliteLedger::open(&config.ledger_path).with_context(|| {
        format!(
            "failed to open ledger at `{}`",
            config.ledger_path.display()
        )
    })?;
    let mailer: Arc<dyn Mailer> = Arc::new(
        SmtpMailer::new(&config.smtp, &config.sender).context("failed to configure mailer")?,
    );
    let pipeline = Arc::new(DeliveryPipeline::new(
        Arc::new(ledger),
        Arc::clone(&mailer),
        Arc::new(FileAnnotator),
        config.recipient.clone(),
    ));

    let mut service = NoteService::new(pipeline, &config.watch_root);
    if let Err(err) = service.start() {
        // The API stays up; the watcher can be started again via /service/start.
        error!("event=watcher_disabled module=cli status=error error={err}");
    }
    let service = Arc::new(Mutex::new(service));

    let state = Arc::new(AppState {
        mailer,
        service: Arc::clone(&service),
        sender_address: config.sender.address.clone(),
        recipient: config.recipient.clone(),
    });
    http::serve(config.http_addr, state, shutdown_signal())
        .await
        .with_context(|| format!("http server failed on {}", config.http_addr))?;

    service.lock().await.stop().await;
    info!("event=app_stop module=cli status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=signal module=cli status=error error={err}");
    }
}

fn check_note(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read `{}`", file.display()))?;
    let note = parse_note(&content);

    println!("sender: {}", note.sender().unwrap_or("<none>"));
    println!("tasks: {}", note.tasks.len());
    for task in &note.tasks {
        println!("  - {task}");
    }
    if note.is_complete {
        println!("status: ready to send");
    } else {
        let missing = note
            .missing()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("status: incomplete (missing {missing})");
    }
    Ok(())
}

fn list_processed(db: Option<PathBuf>) -> Result<()> {
    let path = match db.or_else(|| std::env::var_os(ENV_DB_PATH).map(PathBuf::from)) {
        Some(path) => path,
        None => default_ledger_path()?,
    };
    let ledger = SqliteLedger::open(&path)
        .with_context(|| format!("failed to open ledger at `{}`", path.display()))?;

    for record in ledger.records()? {
        println!(
            "{}  {}",
            format_processed_at(record.processed_at),
            record.file_path
        );
    }
    Ok(())
}

fn format_processed_at(epoch_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_millis)
        .map(|at| {
            at.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| epoch_millis.to_string())
}
