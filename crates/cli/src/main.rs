use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::output;
use cli::progress::BarProgress;
use cli::prompt::confirm_or_decline;
use starsift_core::cleaner;
use starsift_core::config::{self, AppConfig};
use starsift_core::pipeline::{self, RunOutcome};
use std::io::{self, IsTerminal};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = config::load(cli.config.as_deref())?;
    debug!(?cfg, "configuration loaded");

    match cli.command {
        Commands::Run {
            input,
            output,
            min_rating,
            yes,
            dry_run,
            json,
        } => {
            apply_overrides(&mut cfg, input, output, min_rating);
            run(&cfg, yes, dry_run, json)
        }
        Commands::Clean { output, yes, json } => {
            apply_overrides(&mut cfg, None, output, None);
            clean(&cfg, yes, json)
        }
        Commands::Inspect { file } => inspect(&cfg, &file),
    }
}

#[derive(Parser)]
#[command(name = "starsift")]
#[command(about = "Copy the best-rated photos of a folder tree into another folder", long_about = None)]
struct Cli {
    /// Path to a configuration file (JSON, TOML or YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Empty the output folder, then copy every file rated at or above the threshold
    Run {
        /// Source folder (overrides INPUT_PATH)
        #[arg(long)]
        input: Option<String>,
        /// Destination folder, emptied first (overrides OUTPUT_PATH)
        #[arg(long)]
        output: Option<String>,
        /// Minimum rating, 0 to 5 (overrides NOTATION)
        #[arg(long, allow_negative_numbers = true)]
        min_rating: Option<i64>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Only report what would be copied; nothing is deleted or written
        #[arg(long)]
        dry_run: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Empty the output folder only
    Clean {
        /// Destination folder (overrides OUTPUT_PATH)
        #[arg(long)]
        output: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Print the metadata fields the configured provider reads for a file
    Inspect {
        /// File to inspect
        file: String,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn apply_overrides(
    cfg: &mut AppConfig,
    input: Option<String>,
    output: Option<String>,
    min_rating: Option<i64>,
) {
    if input.is_some() {
        cfg.input_path = input;
    }
    if output.is_some() {
        cfg.output_path = output;
    }
    if min_rating.is_some() {
        cfg.notation = min_rating;
    }
}

/// Keeps stdout clean for the JSON document when `json` is set.
fn ask(pending: usize, yes: bool, json: bool) -> bool {
    if yes {
        return true;
    }
    let stdin = io::stdin();
    let mut input = stdin.lock();
    if json {
        confirm_or_decline(pending, &mut input, &mut io::stderr())
    } else {
        confirm_or_decline(pending, &mut input, &mut io::stdout())
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cfg: &AppConfig, yes: bool, dry_run: bool, json: bool) -> Result<()> {
    let settings = cfg.validate()?;
    let provider = pipeline::select_provider(&settings.rating)?;
    let progress = BarProgress::new(!json && io::stderr().is_terminal());

    if dry_run {
        let summary = pipeline::plan(&settings, provider.as_ref(), &progress)?;
        if json {
            return print_json(&output::dry_run_json(&summary, settings.min_rating));
        }
        for path in &summary.copied_paths {
            println!("would copy {}", path);
        }
        println!("{}", output::triage_line("dry run", &summary));
        return Ok(());
    }

    if !json {
        println!(
            "Copying images with a notation equal to or higher than {} from {} to {}.",
            settings.min_rating,
            settings.input.display(),
            settings.output.display()
        );
    }
    let outcome = pipeline::run(
        &settings,
        provider.as_ref(),
        |pending| ask(pending, yes, json),
        &progress,
    )?;
    match outcome {
        RunOutcome::Declined { pending } => {
            if json {
                print_json(&output::declined_json(pending))?;
            }
            Ok(())
        }
        RunOutcome::Completed(summary) => {
            if json {
                return print_json(&output::run_json(&summary, settings.min_rating));
            }
            println!("{}", output::clean_line(&summary.clean));
            println!("{}", output::triage_line("run", &summary.triage));
            Ok(())
        }
    }
}

fn clean(cfg: &AppConfig, yes: bool, json: bool) -> Result<()> {
    let dir = cfg.validate_output()?;
    let pending = cleaner::count_files(&dir)?;
    if !ask(pending, yes, json) {
        if json {
            print_json(&output::declined_json(pending))?;
        }
        return Ok(());
    }
    let report = cleaner::empty_folder(&dir, cfg.clean.method)?;
    if json {
        return print_json(&output::clean_json(&report));
    }
    for failure in &report.failures {
        eprintln!("Failed to delete {}. Reason: {}", failure.path, failure.reason);
    }
    println!("{}", output::clean_line(&report));
    Ok(())
}

fn inspect(cfg: &AppConfig, file: &str) -> Result<()> {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("not a file path: {}", file))?;

    let source = cfg.rating_source()?;
    let provider = pipeline::select_provider(&source)?;
    let fields = provider.read(dir, name)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    match source.vocabulary.rating_of(&fields, &source.rating_field) {
        Ok(rating) => eprintln!("rating: {}", rating),
        Err(e) => eprintln!("rating: {}", e),
    }
    Ok(())
}
