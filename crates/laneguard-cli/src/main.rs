//! Laneguard CLI
//!
//! Command-line interface over JSON network documents:
//! - `verify`: report rule violations
//! - `repair`: run the verify-repair loop and write the repaired network
//! - `partition`: show how a network is split into blocks
//! - `formulas`: list the rule catalog

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use laneguard_engine::{
    parse_formula_ids, MapVerification, Partitioner, RuleCatalog, VerificationConfig,
};
use laneguard_network::{NetworkDocument, RoadNetwork};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "laneguard")]
#[command(
    author,
    version,
    about = "Laneguard: road-network map verification and repair"
)]
struct Cli {
    /// More logging (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a network against the rule catalog.
    Verify {
        #[command(flatten)]
        run: RunArgs,
        /// Exit successfully even when violations are found.
        #[arg(long)]
        no_fail: bool,
    },

    /// Verify and repair a network, then write the result.
    Repair {
        #[command(flatten)]
        run: RunArgs,
        /// Output network document (JSON).
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Show the blocks a network is split into for partitioned runs.
    Partition {
        /// Input network document (JSON).
        input: PathBuf,
        /// Lanelets per block.
        #[arg(long, default_value_t = 50)]
        block_size: usize,
        /// Output format: text|json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the rules of the catalog.
    Formulas {
        /// Output format: text|json
        #[arg(long, default_value = "text")]
        format: String,
        /// Include the formula source of each rule.
        #[arg(long)]
        source: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input network document (JSON).
    input: PathBuf,
    /// Configuration file (JSON); flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Formulas to check, comma separated (default: all).
    #[arg(long, value_delimiter = ',')]
    formulas: Vec<String>,
    /// Repair rounds per violation.
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Lanelet count above which the network is partitioned.
    #[arg(long)]
    partition_threshold: Option<usize>,
    /// Lanelets per partition block.
    #[arg(long)]
    block_size: Option<usize>,
    /// Stay on one thread.
    #[arg(long)]
    sequential: bool,
    /// Report format: text|json
    #[arg(long, default_value = "text")]
    format: String,
    /// Write the report to a file instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Verify { run, no_fail } => cmd_verify(&run, no_fail),
        Commands::Repair { run, out } => cmd_repair(&run, &out),
        Commands::Partition {
            input,
            block_size,
            format,
        } => cmd_partition(&input, block_size, &format),
        Commands::Formulas { format, source } => cmd_formulas(&format, source),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_network(input: &Path) -> Result<RoadNetwork> {
    let text = fs::read_to_string(input)
        .map_err(|e| anyhow!("failed to read {}: {e}", input.display()))?;
    let doc: NetworkDocument = serde_json::from_str(&text)
        .map_err(|e| anyhow!("{} is not a network document: {e}", input.display()))?;
    let network = RoadNetwork::from_document(doc);
    tracing::info!(
        input = %input.display(),
        elements = network.element_count(),
        "loaded network"
    );
    Ok(network)
}

fn load_config(run: &RunArgs) -> Result<VerificationConfig> {
    let mut config = match &run.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| anyhow!("invalid config {}: {e}", path.display()))?
        }
        None => VerificationConfig::default(),
    };
    if !run.formulas.is_empty() {
        config.formulas = parse_formula_ids(run.formulas.as_slice())?;
    }
    if let Some(n) = run.max_iterations {
        config.max_iterations = n;
    }
    if let Some(n) = run.partition_threshold {
        config.partition_threshold = n;
    }
    if let Some(n) = run.block_size {
        config.block_size = n;
    }
    if run.sequential {
        config.parallel = false;
    }
    Ok(config)
}

fn check_format(format: &str) -> Result<String> {
    let format = format.trim().to_ascii_lowercase();
    match format.as_str() {
        "json" | "text" => Ok(format),
        other => Err(anyhow!("unknown --format `{other}` (expected json|text)")),
    }
}

fn emit(rendered: &str, out: Option<&PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, rendered)?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn cmd_verify(run: &RunArgs, no_fail: bool) -> Result<()> {
    let format = check_format(&run.format)?;
    let engine = MapVerification::new(load_config(run)?)?;
    let network = load_network(&run.input)?;
    let result = engine.verify(&network);

    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&result)?,
        _ => report::render_verification_text(&result, &run.input),
    };
    emit(&rendered, run.report.as_ref())?;

    let count = result.initial_violation_count();
    if count > 0 && !no_fail {
        return Err(anyhow!("verification found {count} violation(s)"));
    }
    Ok(())
}

fn cmd_repair(run: &RunArgs, out: &Path) -> Result<()> {
    let format = check_format(&run.format)?;
    let config = load_config(run)?.with_overwrite_scenario(true);
    let engine = MapVerification::new(config)?;
    let mut network = load_network(&run.input)?;
    let outcome = engine.verify_and_repair(&mut network);

    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&outcome.result)?,
        _ => report::render_repair_text(&outcome.result, &run.input),
    };
    emit(&rendered, run.report.as_ref())?;

    fs::write(out, serde_json::to_string_pretty(&network.to_document())?)?;
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());

    if !outcome.result.repairing_possible {
        eprintln!(
            "{} {} violation(s) could not be repaired",
            "warning:".yellow().bold(),
            outcome.result.residual_violations.len()
        );
    }
    Ok(())
}

fn cmd_partition(input: &Path, block_size: usize, format: &str) -> Result<()> {
    let format = check_format(format)?;
    if block_size == 0 {
        return Err(anyhow!("--block-size must be at least 1"));
    }
    let network = load_network(input)?;
    let partition = Partitioner::new(block_size).partition(&network);
    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&partition)?,
        _ => report::render_partition_text(&partition),
    };
    emit(&rendered, None)
}

fn cmd_formulas(format: &str, source: bool) -> Result<()> {
    let format = check_format(format)?;
    let catalog = RuleCatalog::standard()?;
    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&report::formula_listing(&catalog))?,
        _ => report::render_formulas_text(&catalog, source),
    };
    emit(&rendered, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let cli = Cli::try_parse_from([
            "laneguard",
            "verify",
            "net.json",
            "--formulas",
            "unique_id_la,existence_successor",
            "--max-iterations",
            "7",
            "--sequential",
        ])
        .unwrap();
        let Commands::Verify { run, .. } = cli.command else {
            panic!("expected verify");
        };
        let config = load_config(&run).unwrap();
        assert_eq!(config.formulas.len(), 2);
        assert_eq!(config.max_iterations, 7);
        assert!(!config.parallel);
        assert_eq!(config.partition_threshold, 200);
    }

    #[test]
    fn unknown_formula_names_are_rejected() {
        let cli = Cli::try_parse_from(["laneguard", "verify", "net.json", "--formulas", "nope"])
            .unwrap();
        let Commands::Verify { run, .. } = cli.command else {
            panic!("expected verify");
        };
        assert!(load_config(&run).is_err());
    }

    #[test]
    fn formats_are_checked() {
        assert_eq!(check_format(" JSON ").unwrap(), "json");
        assert!(check_format("yaml").is_err());
    }
}
