//! # redline
//!
//! Line-oriented client: load a JSON document, chat with the agent about
//! it, and watch its edits land with undo/redo.

#![deny(unsafe_code)]

mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use redline_core::logging::{init_json_subscriber, init_subscriber};
use redline_runtime::{HttpTransport, SessionController};
use redline_settings::{LogFormat, RedlineSettings, get_settings, reload_settings_from_path};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::commands::{Command, HELP};

/// Chat with an agent that edits a JSON document.
#[derive(Parser, Debug)]
#[command(name = "redline", version, about)]
struct Cli {
    /// Agent backend base URL (overrides settings).
    #[arg(long)]
    server: Option<String>,

    /// Document to load on startup.
    #[arg(long)]
    document: Option<PathBuf>,

    /// Settings file (default `~/.redline/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `info` or `redline_runtime=debug` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn resolve_settings(&self) -> RedlineSettings {
        let loaded = match &self.settings {
            Some(path) => reload_settings_from_path(path),
            None => get_settings(),
        };
        let mut settings = RedlineSettings::clone(&loaded);
        if let Some(server) = &self.server {
            settings.server.base_url = server.trim_end_matches('/').to_string();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve_settings();

    match settings.logging.format {
        LogFormat::Compact => init_subscriber(&settings.logging.level),
        LogFormat::Json => init_json_subscriber(&settings.logging.level),
    }
    info!(server = %settings.server.base_url, "starting redline");

    let transport = HttpTransport::new(settings.server.clone())
        .context("Failed to build HTTP client")?;
    let controller = SessionController::new(Arc::new(transport), &settings);

    let printer = spawn_printer(&controller);

    if controller.setup().await.is_err() {
        eprintln!(
            "warning: agent backend at {} did not answer setup",
            settings.server.base_url
        );
    }

    if let Some(path) = &cli.document {
        load(&controller, path).await;
    }

    println!("redline ready, /help for commands");
    repl(&controller).await?;

    printer.abort();
    Ok(())
}

/// Print session updates as they arrive.
fn spawn_printer(controller: &SessionController) -> tokio::task::JoinHandle<()> {
    let mut rx = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => {
                    if let Some(line) = render::describe(&update) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "printer fell behind, some updates were not shown");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn repl(controller: &SessionController) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let Some(command) = commands::parse(&line) else {
            continue;
        };
        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Invalid(message) => println!("{message}"),
            Command::Prompt(prompt) => {
                if controller.submit(&prompt).is_none() {
                    println!("not sent: load a document first, or wait for the running request");
                }
            }
            Command::Load(path) => load(controller, &path).await,
            Command::Remove => {
                if !controller.remove_document().await {
                    println!("no document loaded");
                }
            }
            Command::Undo => match controller.undo() {
                Ok(true) => {}
                Ok(false) => println!("nothing to undo"),
                Err(e) => println!("undo failed: {e}"),
            },
            Command::Redo => match controller.redo() {
                Ok(true) => {}
                Ok(false) => println!("nothing to redo"),
                Err(e) => println!("redo failed: {e}"),
            },
            Command::Cancel => {
                if !controller.cancel().await {
                    println!("no request running");
                }
            }
            Command::Clear => controller.clear_context().await,
            Command::Select(ids) => {
                println!("{} selected", ids.len());
                controller.set_selection(ids);
            }
            Command::Export(path) => match controller.export(&path) {
                Ok(()) => println!("exported to {}", path.display()),
                Err(e) => println!("export failed: {e}"),
            },
            Command::Status => println!("{}", render::status(&controller.view())),
        }
    }
    Ok(())
}

async fn load(controller: &SessionController, path: &std::path::Path) {
    match controller.load_document_file(path).await {
        Ok(info) => println!("loaded {} ({})", info.name, info.display_size()),
        Err(e) => println!("could not load {}: {e}", path.display()),
    }
}
