//! ligvis — attribution maps for CNN docking scores.
//! Entry point for the command-line binary.

mod config;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ligvis_cnn::CnnScorer;
use ligvis_engine::{visualize, VisError};

use crate::config::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    // Logs go to stderr; stdout carries the report.
    let default_filter = if cli.verbose { "ligvis=debug,warn" } else { "ligvis=info,warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.downcast_ref::<VisError>().map_or(2, VisError::exit_code);
            if code == 1 {
                eprintln!("{}\n\nCorrect usage:\n{}", e, Cli::command().render_help());
            } else {
                error!("{:#}", e);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    config.validate()?;
    info!("ligvis {} ({} method)", env!("CARGO_PKG_VERSION"), config.method);

    let model = config.model_path()?;
    let scorer = CnnScorer::load(model, config.weights_path()?, config.gpu)
        .map_err(VisError::from)
        .with_context(|| format!("Failed to load CNN model {}", model.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let results = visualize(&config, &scorer, &mut out)?;
    out.flush()?;

    let failed: usize = results.iter().map(|r| r.failed_writes.len()).sum();
    info!("Done: {} result(s), {} failed file write(s)", results.len(), failed);
    Ok(())
}
