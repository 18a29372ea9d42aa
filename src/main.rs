//! sonora-bulk
//!
//! # What this program is
//! A command-line bulk tag editor. Point it at folders of `.mp3` files and it
//! opens every tag in an SQL editor at once, as one table:
//!
//! ```text
//! sonora-bulk ~/Music/Bach
//! sqlite> UPDATE tracks SET artist = 'Bach, Johann Sebastian' WHERE artist = 'J.S. Bach';
//! sqlite> .quit
//! 3 changed (0 renamed), 0 deleted. [s]ave / [e]dit / [a]bandon? s
//! ```
//!
//! # Flow
//! discover files -> load snapshot -> edit -> save / edit again / abandon.
//! Only rows the editor touched are written back. Changing `path` moves the
//! file, deleting a row deletes the file.
//!
//! `--execute <SQL>` skips the editor and the question: run the SQL, then save.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};

use sonora_bulk::config::{self, CliOverrides, ConfigError};
use sonora_bulk::core::error::SessionError;
use sonora_bulk::core::reconcile::{FailurePolicy, NullPolicy, ReconcileReport, Reconciler};
use sonora_bulk::core::session::{
    CommandEditor, Decision, FixedDecision, Outcome, ScriptEditor, Session, TerminalPrompt,
};
use sonora_bulk::core::tags::Id3Codec;
use sonora_bulk::logging::{self, Verbosity};

#[derive(Parser, Debug)]
#[command(name = "sonora-bulk")]
#[command(about = "Bulk-edit audio tags as an SQLite table")]
#[command(version)]
struct Cli {
    /// Files or folders to load (folders are walked recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Separator for multi-valued fields in the table (default `;`)
    #[arg(long)]
    separator: Option<String>,

    /// Editor command; the snapshot path is appended (default `sqlite3`)
    #[arg(long)]
    editor: Option<String>,

    /// Where the temporary snapshot database is created
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Config file (default `<config dir>/sonora/bulk.toml`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run this SQL instead of opening the editor, then save
    #[arg(long, value_name = "SQL")]
    execute: Option<String>,

    /// Leave fields set to NULL untouched instead of clearing them
    #[arg(long)]
    skip_null: bool,

    /// Keep failed entries so the save can be retried
    #[arg(long)]
    retain_failed: bool,

    /// Debug output
    #[arg(short, long)]
    verbose: bool,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    /// No ANSI colors in log output
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            separator: self.separator.clone(),
            editor: self.editor.clone(),
            snapshot_dir: self.snapshot_dir.clone(),
            null_fields: self.skip_null.then_some(NullPolicy::Skip),
            on_failure: self.retain_failed.then_some(FailurePolicy::Retain),
            config_path: self.config.clone(),
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet), cli.no_color);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "aborted");
            eprintln!("sonora-bulk: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Ok(true) when everything went through without a single failure.
fn run(cli: &Cli) -> Result<bool, AppError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let loaded = config::load_from_sources(&env, &cli.overrides())?;
    if let Some(path) = &loaded.config_file_used {
        info!(path = %path.display(), "config file loaded");
    }
    let config = loaded.config;

    let (paths, skipped) = sonora_bulk::core::scan_paths(&cli.paths, &config.discovery);
    if paths.is_empty() {
        warn!("no matching files found");
        return Ok(skipped.is_empty());
    }

    let codec = Id3Codec::default();
    let mv = config.multi_value();

    let mut session = Session::open(&config.snapshot_dir)?;
    session.load(&codec, mv, &paths)?;

    let reconciler = Reconciler::new(&codec, mv)
        .null_policy(config.reconcile.null_fields)
        .failure_policy(config.reconcile.on_failure);

    let outcome = match &cli.execute {
        Some(sql) => session.run(
            &mut ScriptEditor::new(sql.as_str()),
            &mut FixedDecision(Decision::Save),
            &reconciler,
        )?,
        None => session.run(
            &mut CommandEditor::new(config.editor.program.as_str(), config.editor.args.clone()),
            &mut TerminalPrompt::stdio(),
            &reconciler,
        )?,
    };

    let clean = match outcome {
        Outcome::Abandoned => {
            println!("abandoned, no file was changed");
            true
        }
        Outcome::Saved(report) => {
            print_report(&report);
            report.is_clean()
        }
    };
    Ok(clean && skipped.is_empty())
}

fn print_report(report: &ReconcileReport) {
    println!(
        "{} updated, {} moved, {} deleted, {} failed",
        report.updated.len(),
        report.moved.len(),
        report.deleted.len(),
        report.failures.len()
    );
    for (from, to) in &report.moved {
        println!("  moved {} -> {}", from.display(), to.display());
    }
    for failure in &report.failures {
        println!("  FAILED {}", failure);
    }
}
