//! `prospect`: command-line driver for streamed prospect analysis.
//!
//! ```bash
//! # Analyse the records in job.json and follow progress
//! prospect run --input job.json --base-url https://host/api/data/ --token "$TOKEN"
//!
//! # Review a saved result, best scores first
//! prospect history output/<job-id>.ron --sort score
//! ```

mod app;
mod cli;
mod commands;
mod config;
mod effects;
mod persistence;
mod render;

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::engine_info;
use prospect_core::{arrange, JobInput, JobStatus, RecordRowView};

use cli::{Cli, Command, HistoryArgs, RunArgs};
use config::AppConfig;

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = config::load(cli.config.as_deref())?;
    config.apply_log_overrides(cli.log.as_deref(), cli.log_level.as_deref());

    match cli.command {
        Command::Run(args) => run_command(config, args),
        Command::History(args) => history_command(&config, args),
    }
}

fn run_command(mut config: AppConfig, args: RunArgs) -> Result<ExitCode> {
    config.apply_run_overrides(&args);
    // Only `run` logs; `history` must not truncate the previous run's log file.
    engine_logging::initialize(
        config.log_destination()?,
        config.log_level()?,
        &config.log_file,
    );
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading job input {}", args.input.display()))?;
    let input: JobInput = serde_json::from_str(&text)
        .with_context(|| format!("parsing job input {}", args.input.display()))?;
    engine_info!(
        "Starting job for {} records from {:?}",
        input.data_items.len(),
        args.input
    );

    let summary = app::run_job(
        &config,
        app::RunOptions {
            input,
            save: !args.no_save,
        },
    )?;
    if let Some(path) = &summary.saved_to {
        println!("saved {}", path.display());
    }
    let code = match summary.status {
        Some(JobStatus::Completed) | Some(JobStatus::Terminated) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    };
    Ok(code)
}

fn history_command(config: &AppConfig, args: HistoryArgs) -> Result<ExitCode> {
    let Some(file) = args.file else {
        let dir = args.output_dir.as_deref().unwrap_or(&config.output_dir);
        let names = persistence::store(dir).list()?;
        if names.is_empty() {
            println!("no saved results in {}", dir.display());
        }
        for name in names {
            println!("{name}");
        }
        return Ok(ExitCode::SUCCESS);
    };

    let saved = persistence::load_snapshot(&file)?;
    let snapshot = &saved.snapshot;
    println!(
        "[{}] job {} | {}/{} records | saved {}",
        render::status_label(Some(snapshot.status)),
        snapshot.job_id.as_deref().unwrap_or("-"),
        snapshot.records.len(),
        snapshot.total,
        saved.saved_at
    );
    let rows: Vec<RecordRowView> = arrange(&snapshot.records, args.sort, &args.search)
        .into_iter()
        .map(RecordRowView::from)
        .collect();
    println!("{}", render::table(&rows));
    Ok(ExitCode::SUCCESS)
}
