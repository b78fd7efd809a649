// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::{Args, Parser, Subcommand, ValueEnum};
use csv::Writer;
use serde::Serialize;
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use token_ledger::server::{self, AppState};
use token_ledger::{CategoryLimits, FileStore, Ledger, OnCorrupt, Repository};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Token Ledger - cashless token economy for event games
///
/// Tracks player balances, enforces per-game spending limits and prize
/// exchange caps, and serves a live ranking to the operator dashboard.
#[derive(Parser, Debug)]
#[command(name = "token-ledger")]
#[command(about = "A token ledger for event games and prize exchange", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API and the operator front-end
    Serve(ServeArgs),
    /// Write a collection to stdout as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Directory holding users.json, history.json and ranking.json
    #[arg(long, env = "LEDGER_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// How to handle a document that exists but cannot be parsed
    #[arg(long, env = "LEDGER_ON_CORRUPT", value_enum, default_value_t = OnCorrupt::TreatAsEmpty)]
    on_corrupt: OnCorrupt,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, env = "HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Operator front-end directory (pages/, js/, ...)
    #[arg(long, env = "LEDGER_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// JSON file mapping category to limit; must include "default"
    #[arg(long, env = "LEDGER_LIMITS")]
    limits: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(value_enum)]
    collection: ExportTarget,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportTarget {
    Users,
    History,
    Ranking,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `export` output on stdout stays clean.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Export(args) => run_export(&args, std::io::stdout()),
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn open_ledger(files: FileStore, on_corrupt: OnCorrupt, limits: CategoryLimits) -> Ledger {
    info!(dir = %files.dir().display(), ?on_corrupt, "Data directory opened");
    let repository = Repository::new(Arc::new(files), on_corrupt);
    Ledger::new(repository, limits)
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let limits = match &args.limits {
        Some(path) => CategoryLimits::from_file(path)?,
        None => CategoryLimits::default(),
    };
    info!(limits = ?limits.entries(), "Category limits loaded");

    // Serving may start on a fresh directory.
    let files = FileStore::open(&args.store.data_dir)?;
    let ledger = open_ledger(files, args.store.on_corrupt, limits);
    ledger.normalize()?;

    if let Some(dir) = &args.static_dir {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Static directory not found, pages will return 404");
        }
    }

    let app = server::router(AppState::new(ledger), args.static_dir.as_deref());
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

/// Exports from an existing data directory; a missing one is an error.
fn run_export<W: Write>(args: &ExportArgs, writer: W) -> Result<(), Box<dyn Error>> {
    let files = FileStore::open_existing(&args.store.data_dir)?;
    let ledger = open_ledger(files, args.store.on_corrupt, CategoryLimits::default());
    export(&ledger, args.collection, writer)
}

/// Writes one collection as CSV.
///
/// Columns follow the JSON field names, e.g. for history:
///
/// ```csv
/// timestamp,id,games,type,amount,balance,exchangedAmount
/// 2025-10-04T10:15:02Z,CC-2025-K3Q9ZP,roulette,subtract,100,50,0
/// ```
fn export<W: Write>(ledger: &Ledger, target: ExportTarget, writer: W) -> Result<(), Box<dyn Error>> {
    match target {
        ExportTarget::Users => write_csv(&ledger.users()?, writer)?,
        ExportTarget::History => write_csv(&ledger.history()?, writer)?,
        ExportTarget::Ranking => write_csv(&ledger.ranking()?, writer)?,
    }
    Ok(())
}

fn write_csv<T: Serialize, W: Write>(rows: &[T], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
