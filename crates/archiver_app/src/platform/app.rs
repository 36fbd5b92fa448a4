use std::process::ExitCode;

use anyhow::{Context, Result};
use archive_logging::{archive_error, archive_info, archive_warn};
use archiver_core::RunView;
use archiver_engine::{EngineConfig, LogProgressSink, Pipeline, PipelineError};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use super::cli::Cli;
use super::config::resolve_config;
use super::logging;

const EXIT_FAILURE: u8 = 1;
/// Conventional status for a process stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

pub fn run_app() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log_file.clone(), cli.verbose);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            archive_error!("{err:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            archive_error!("Failed to start the async runtime: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    runtime.block_on(archive(config))
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    resolve_config(cli, cwd)
}

async fn archive(config: EngineConfig) -> ExitCode {
    archive_info!(
        "Archiving {} into {:?} ({:?}, {} parallel conversions)",
        config.landing_url,
        config.layout().tool_dir(),
        config.mode,
        config.max_concurrent_conversions
    );
    let pipeline = match Pipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            archive_error!("{err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let sink = LogProgressSink::new();
    let result = pipeline.run_from_landing(&sink, &cancel).await;
    interrupt.abort();

    match result {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(PipelineError::Interrupted { summary }) => {
            archive_warn!("Interrupted by user");
            report(&summary);
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(err) => {
            archive_error!("{err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            archive_warn!("Ctrl-C received, finishing running conversions");
            cancel.cancel();
        }
        Err(err) => archive_warn!("Cannot listen for Ctrl-C: {err}"),
    }
}

fn report(summary: &RunView) {
    archive_info!(
        "Done: {} lessons, {} html pages, {} conversions",
        summary.progress_label(),
        summary.html_written,
        summary.conversions_succeeded
    );
    if summary.benign_diagnostics > 0 {
        archive_info!(
            "{} pdf renders reported the known harmless renderer warning",
            summary.benign_diagnostics
        );
    }
    if !summary.is_clean() {
        archive_warn!(
            "{} fetch failures, {} sanitize skips, {} failed conversions",
            summary.fetch_failures,
            summary.sanitize_skips,
            summary.conversions_failed
        );
        for (ordinal, format) in &summary.failures {
            match format {
                Some(format) => archive_warn!("  {ordinal} ({format})"),
                None => archive_warn!("  {ordinal}"),
            }
        }
    }
}
