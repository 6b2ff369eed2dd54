//! Command-line driver for a hashpaste store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hashpaste_core::{
    open_store, Config, Metadata, Outcome, PasteService, PasteStore, PasteView, ServiceSettings,
    Severity, NO_PASTES_SENTINEL,
};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "hpaste",
    about = "Store and read content-addressed pastes",
    long_about = "Store and read content-addressed pastes.\n\nThe backend is chosen with \
                  HASHPASTE_BACKEND (filesystem, sqlite, postgres, kv, redis, s3, azure, memory).",
    version
)]
struct Cli {
    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Prepare the configured backend (safe to repeat)
    Init,
    /// Store a paste read from a file or stdin
    New {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long, default_value = "public")]
        visibility: String,
    },
    /// Show a paste with its date and size
    View { id: String },
    /// Print only the content of a paste
    Raw { id: String },
    /// List public pastes
    List,
    /// Show every metadata entry of a paste
    Meta { id: String },
}

/// What a command prints and how the process exits.
#[derive(Debug, Default, PartialEq, Eq)]
struct Rendered {
    stdout: Option<String>,
    stderr: Option<String>,
    exit_code: i32,
}

#[derive(Serialize)]
struct JsonOutcome<'a, T> {
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

fn render<T: Serialize>(
    outcome: &Outcome<T>,
    json: bool,
    text: impl Fn(&T) -> String,
) -> anyhow::Result<Rendered> {
    let exit_code = match outcome.severity() {
        Severity::Error => 1,
        Severity::Warning | Severity::Info => 0,
    };
    if json {
        let status = match outcome {
            Outcome::Error(err) => Some(err.suggested_status()),
            _ => None,
        };
        let body = JsonOutcome {
            severity: outcome.severity(),
            value: outcome.value(),
            message: outcome.message(),
            status,
        };
        return Ok(Rendered {
            stdout: Some(
                serde_json::to_string_pretty(&body).context("response encoding error")?,
            ),
            stderr: None,
            exit_code,
        });
    }

    let prefix = match outcome {
        Outcome::Ok(_) => None,
        Outcome::Info { .. } => Some("note"),
        Outcome::Warning { .. } => Some("warning"),
        Outcome::Error(_) => Some("error"),
    };
    Ok(Rendered {
        stdout: outcome.value().map(text),
        stderr: prefix
            .zip(outcome.message())
            .map(|(prefix, message)| format!("{}: {}", prefix, message)),
        exit_code,
    })
}

fn format_date(date: Option<&str>) -> String {
    date.and_then(|value| value.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unavailable".to_string())
}

fn format_view(view: &PasteView) -> String {
    format!(
        "Paste: {}\nDate:  {}\nSize:  {}\n\n{}",
        view.id,
        format_date(view.date.as_deref()),
        view.size,
        view.content
    )
}

fn format_listing(ids: &[String]) -> String {
    if ids.len() == 1 && ids[0] == NO_PASTES_SENTINEL {
        return "No public pastes.".to_string();
    }
    ids.join("\n")
}

fn format_metadata(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_content(file: Option<&PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn run<S: PasteStore + ?Sized>(
    command: &Commands,
    service: &PasteService<S>,
    backend: &str,
    json: bool,
) -> anyhow::Result<Rendered> {
    match command {
        Commands::Init => render(&Outcome::Ok(backend.to_string()), json, |name| {
            format!("Backend ready: {}", name)
        }),
        Commands::New { file, visibility } => {
            let content = read_content(file.as_ref())?;
            render(&service.create(&content, visibility), json, String::clone)
        }
        Commands::View { id } => render(&service.view(id), json, format_view),
        Commands::Raw { id } => render(&service.raw(id), json, String::clone),
        Commands::List => render(&service.list(), json, |ids| format_listing(ids)),
        Commands::Meta { id } => render(&service.metadata(id), json, format_metadata),
    }
}

fn emit(rendered: &Rendered) -> anyhow::Result<()> {
    if let Some(stdout) = &rendered.stdout {
        let mut out = io::stdout().lock();
        out.write_all(stdout.as_bytes())?;
        if !stdout.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    if let Some(stderr) = &rendered.stderr {
        eprintln!("{}", stderr);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hashpaste=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Cli { json, command } = Cli::parse();

    let config = Config::from_env()?;
    let store = open_store(&config.backend)?;
    store.initialize_backend()?;
    tracing::debug!(backend = config.backend.name(), "Backend initialized");
    let service = PasteService::new(store, ServiceSettings::from(&config));

    let rendered = run(&command, &service, config.backend.name(), json)?;
    emit(&rendered)?;
    if rendered.exit_code != 0 {
        std::process::exit(rendered.exit_code);
    }
    Ok(())
}
