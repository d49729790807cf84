//! exiftags CLI - Serve metadata tag definitions as JSON
//!
//! Usage:
//!   exiftags serve [--host <host>] [--port <port>]
//!   exiftags list
//!
//! Examples:
//!   exiftags serve --port 8080
//!   exiftags --config ./exiftags.toml list > tags.json

use clap::{Parser, Subcommand};
use exiftags::config::Settings;
use exiftags::stream::TagStream;
use exiftags::tool::ToolLauncher;
use exiftags::web;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "exiftags")]
#[command(about = "exiftags - Serve metadata tag definitions as streamed JSON")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to the usual lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write the tag listing to stdout once
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let mut settings = match settings {
        Ok(s) => s,
        Err(e) => {
            error!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            cmd_serve(settings).await
        }
        Commands::List => cmd_list(settings).await,
    }
}

async fn cmd_serve(settings: Settings) -> ExitCode {
    match web::serve(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_list(settings: Settings) -> ExitCode {
    let run = match ToolLauncher::from_settings(&settings.tool).and_then(|l| l.launch()) {
        Ok(run) => run,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let TagStream {
        mut chunks,
        outcome,
        exit,
    } = TagStream::spawn(run);

    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = chunks.recv().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = write_chunk(&mut stdout, &bytes).await {
            error!("Error writing to stdout: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let completed = matches!(outcome.await, Ok(o) if o.is_completed());
    let clean_exit = matches!(exit.await, Ok(Ok(e)) if e.is_clean());

    if completed {
        if let Err(e) = write_chunk(&mut stdout, b"\n").await {
            error!("Error writing to stdout: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if completed && clean_exit {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn write_chunk<W>(out: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(bytes).await?;
    out.flush().await
}
