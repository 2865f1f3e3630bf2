// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// vpdf — Convert text, Markdown, or DOCX files into paginated PDFs.
//
// Entry point. Initialises logging, resolves configuration, and runs one
// session per command.

mod services;
mod state;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use vpdf_core::AppConfig;
use vpdf_core::error::Result;
use vpdf_document::UploadedSource;

use services::config_store::{load_config, persist_config, read_config_file};
use services::data_dir::data_dir;
use services::session::Session;

#[derive(Debug, Parser)]
#[command(name = "vpdf", version, about = "Convert .txt, .md and .docx files into paginated PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a file to PDF.
    Convert {
        input: PathBuf,
        /// Directory the PDF is saved into.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Settings file to use instead of the saved config.
        #[arg(long, env = "VPDF_CONFIG")]
        config: Option<PathBuf>,
        /// Skip notification pacing and the download delay.
        #[arg(long)]
        fast: bool,
    },
    /// Print the page layout of a file as JSON without writing a PDF.
    Inspect {
        input: PathBuf,
        #[arg(long, env = "VPDF_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config {
        /// Also write it to the data directory.
        #[arg(long)]
        save: bool,
    },
}

fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => read_config_file(path),
        None => {
            let config = load_config(&data_dir()).unwrap_or_default();
            config.validate()?;
            Ok(config)
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Convert {
            input,
            out_dir,
            config,
            fast,
        } => {
            let mut config = resolve_config(config.as_deref())?;
            if fast {
                config = config.without_pacing();
            }
            let session = Session::with_defaults(config, vpdf_bridge::default_sink());
            session.upload(&UploadedSource::from_path(&input)).await?;
            if let Some(report) = session.convert(&out_dir).await? {
                println!(
                    "{} ({} pages, sha256 {})",
                    report.file.path.display(),
                    report.pages.len(),
                    report.file.sha256
                );
            }
        }
        Command::Inspect { input, config } => {
            let config = resolve_config(config.as_deref())?.without_pacing();
            let session = Session::with_defaults(config, vpdf_bridge::default_sink());
            session.upload(&UploadedSource::from_path(&input)).await?;
            let pages = session.inspect()?;
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }
        Command::Config { save } => {
            let dir = data_dir();
            let config = load_config(&dir).unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let path = persist_config(&dir, &config)?;
                info!(path = %path.display(), "Config written");
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("vpdf starting");

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "vpdf failed");
            ExitCode::FAILURE
        }
    }
}
