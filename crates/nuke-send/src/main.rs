//! nuke-send - run a script inside Nuke from the terminal.
//!
//! Reads the script from FILE (or stdin), sends it to the NukeServerSocket
//! listener and prints the listener's response on stdout. Logs and
//! notifications go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use nuke_bridge::{
    platform, FileDocument, RemoteExecService, Settings, TracingNotifier, WriterSink,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "nuke-send")]
#[command(about = "Run Python code inside Nuke through NukeServerSocket")]
struct Args {
    /// Script to run (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Send a hello message instead of a script
    #[arg(long, conflicts_with = "file")]
    test: bool,

    /// Print the resolved listener address and exit
    #[arg(long)]
    print_address: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    debug!("Starting nuke-send on {}", platform::current_platform());

    let settings = load_settings(args.settings.as_deref())?;
    let sink = Arc::new(WriterSink::new(std::io::stdout()));
    let service = RemoteExecService::new(settings, sink, Arc::new(TracingNotifier));

    if args.print_address {
        // Intentional stdout: callers parse this line
        println!("{}", service.resolve().address);
        return Ok(());
    }

    if args.test {
        service.test_connection().await?;
        return Ok(());
    }

    match args.file {
        Some(path) => {
            let document = FileDocument::open(&path)?;
            info!("Running {}", document.path().display());
            service
                .with_document_provider(Arc::new(document))
                .run_active_document()
                .await?;
        }
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("Failed to read script from stdin")?;
            service.run_code("", code).await?;
        }
    }

    Ok(())
}

/// Load settings from an explicit path, else the default location when it
/// exists, else built-in defaults.
fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return Ok(Settings::load(path)?);
    }

    match platform::default_settings_path() {
        Ok(path) if path.exists() => {
            debug!("Loading settings from {}", path.display());
            Ok(Settings::load(&path)?)
        }
        _ => {
            debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}
