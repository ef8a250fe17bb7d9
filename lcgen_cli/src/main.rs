//! # Lcgen CLI Application
//!
//! Generates the design load combinations of a `.lcg` project file and
//! writes them as JSON.
//!
//! ```text
//! lcgen bridge.lcg -o combinations.json
//! lcgen bridge.lcg --situation ULS-Persistent --situation SLS-Rare
//! lcgen railway.lcg --merge roadway.lcg
//! ```
//!
//! Logging goes to stderr through `env_logger` (`RUST_LOG=debug` for every
//! rejected branch); the combinations go to stdout unless `--output` is set.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};

use lcgen_core::errors::CombResult;
use lcgen_core::file_io::{load_project, load_project_with_lock_check, save_combinations, FileLock};
use lcgen_core::serializer;
use lcgen_core::situation::Situation;

#[derive(Debug, Parser)]
#[command(name = "lcgen")]
#[command(about = "Generate design load combinations from a project file", version)]
struct Args {
    /// Project file (.lcg)
    project: PathBuf,

    /// Write the combinations to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only generate these situations (repeatable), e.g. ULS-Persistent
    #[arg(long = "situation")]
    situations: Vec<Situation>,

    /// Further projects whose combinations are merged into the result
    #[arg(long)]
    merge: Vec<PathBuf>,

    /// Identifier recorded in the lock file
    #[arg(long)]
    user: Option<String>,

    /// Generate situations one after the other
    #[arg(long)]
    sequential: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {}", error);
            if let Ok(json) = serde_json::to_string_pretty(&error) {
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> CombResult<()> {
    let user = args
        .user
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "lcgen".to_string());
    let _lock = FileLock::acquire(&args.project, user)?;

    let mut project = load_project(&args.project)?;
    if !args.situations.is_empty() {
        project.settings.situations = args.situations.clone();
    }
    if args.sequential {
        project.settings.parallel = false;
    }

    let mut outcome = project.generate()?;

    for path in &args.merge {
        // merged projects are only read, so another user's lock is reported, not taken
        let (mut other, lock) = load_project_with_lock_check(path)?;
        if let Some(lock) = lock {
            warn!(
                "{} is being edited by {} since {}; merging the saved version",
                path.display(),
                lock.user_id,
                lock.locked_at
            );
        }
        other.settings.situations = project.settings.situations.clone();
        other.settings.parallel = project.settings.parallel;
        let extra = other.generate()?;
        let incoming = extra.container.len();
        let dropped = outcome.container.merge(extra.container);
        info!(
            "Merged {} combinations from {} ({} duplicates dropped)",
            incoming - dropped,
            path.display(),
            dropped
        );
        outcome.warnings.extend(extra.warnings);
    }

    if !outcome.warnings.is_empty() {
        info!("{} branches skipped for missing factors", outcome.warnings.len());
    }

    match &args.output {
        Some(path) => save_combinations(&outcome.container, path)?,
        None => print!("{}", serializer::write(&outcome.container)?),
    }
    Ok(())
}
