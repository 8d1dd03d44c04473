//! `dreamdtb`: a dream journal written in your own editor.

mod cli;
mod commands;
mod error;
mod launch;
mod paths;
mod runtime;
mod settings;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use dreamnote_core::{Journal, NoteDraft};
use log::{error, info};

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::launch::{LaunchReport, Opening};
use crate::paths::AppPaths;

/// Sets up `env_logger`. While the editor owns the terminal, records go to
/// `log_file` instead of stderr.
pub fn initialize_logger(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = match (verbose, log_file) {
        (true, _) => "debug",
        (false, Some(_)) => "info",
        (false, None) => "warn",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    builder.format_timestamp_secs().format_module_path(true);
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();

    info!("Logger initialized");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("dreamdtb: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::from_env()?
        .with_settings_file(cli.config)
        .with_database(cli.database);
    paths.ensure_dirs()?;

    let command = cli.command.unwrap_or(Commands::Launch { open: Vec::new() });
    let log_file = command.uses_editor().then_some(paths.log_file.as_path());
    initialize_logger(cli.verbose, log_file)?;
    info!("database: {}", paths.database.display());

    let settings = settings::load_or_init_settings(&paths.settings_file);

    match command {
        Commands::Add {
            title,
            date,
            note_type,
            tags,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let mut draft = NoteDraft::new(title, date)?.with_tags(tags);
            if let Some(note_type) = note_type {
                draft = draft.with_note_type(note_type);
            }
            let report = launch::run(&paths, &settings, Opening::New(draft))?;
            print_report(&report);
        }
        Commands::Launch { open } => {
            let report = launch::run(&paths, &settings, Opening::Existing(open))?;
            print_report(&report);
        }
        Commands::Browse { json } => {
            let journal = Journal::open(&paths.database)?;
            commands::browse(&journal, json, &mut commands::stdout())?;
        }
        Commands::Book { output } => {
            let journal = Journal::open(&paths.database)?;
            let count = commands::book(&journal, output.as_deref(), &mut commands::stdout())?;
            if let Some(path) = output {
                println!("{count} dreams written to {}", path.display());
            }
        }
        Commands::Stat { top } => {
            let journal = Journal::open(&paths.database)?;
            commands::stat(&journal, top, &mut commands::stdout())?;
        }
    }
    Ok(())
}

fn print_report(report: &LaunchReport) {
    match (report.saved, report.failed) {
        (0, 0) => println!("Nothing to save."),
        (saved, 0) => println!("{saved} dream(s) saved."),
        (saved, failed) => {
            println!("{saved} dream(s) saved, {failed} could not be saved (see the log).")
        }
    }
}
