//! respool CLI: replay acquire/release scripts against the resource cache.

mod replay;
mod script;

use clap::{Parser, Subcommand};
use respool_core::config::CacheConfig;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::replay::replay;
use crate::script::Script;

#[derive(Parser)]
#[command(name = "respool")]
#[command(
    about = "Keyed resource cache with a FIFO grace buffer: script replay and validation",
    long_about = None
)]
struct Cli {
    /// Log cache events (equivalent to RUST_LOG=trace)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script and print the resulting events and statistics
    Replay {
        /// Path to the script YAML file
        #[arg(short, long)]
        script: PathBuf,

        /// Grace-buffer capacity (overrides env and script config)
        #[arg(long)]
        grace_capacity: Option<usize>,
    },

    /// Validate a script YAML file (syntax and step ordering)
    Validate {
        /// Path to the script YAML file
        #[arg(short, long)]
        script: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            script,
            grace_capacity,
        } => {
            if let Err(e) = run_replay(&script, grace_capacity) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { script } => {
            if let Err(e) = validate_script(&script) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Script is valid");
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A second init (tests, embedding) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_replay(
    script_path: &PathBuf,
    grace_capacity: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = fs::read_to_string(script_path)?;
    let script = Script::parse(&yaml)?;

    let config = resolve_config(CacheConfig::from_env(), &script, grace_capacity);
    tracing::debug!(grace_capacity = config.grace_capacity, tag = %config.tag, "replaying script");

    let report = replay(&script, &config);

    println!("Replay ({} steps, grace capacity {})", script.steps.len(), config.grace_capacity);
    println!("======================");
    for (i, event) in report.events.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, event);
    }
    println!();
    println!("Before teardown:");
    println!("  Live entries: {}", report.live);
    println!("  Grace buffer: [{}]", report.grace.join(", "));
    println!();
    println!("Statistics:");
    println!("  Created: {}", report.stats.created);
    println!("  Hits: {}", report.stats.hits);
    println!("  Rescues: {}", report.stats.rescues);
    println!("  Releases: {}", report.stats.releases);
    println!("  Rejected releases: {}", report.stats.rejected_releases);
    println!("  Evictions: {}", report.stats.evictions);
    println!("  Peak entries: {}", report.stats.peak_entries);
    println!("  Disposed at teardown: {}", report.teardown_disposed);

    Ok(())
}

fn validate_script(script_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = fs::read_to_string(script_path)?;
    let _ = Script::parse(&yaml)?;
    Ok(())
}

/// defaults < environment < script config < CLI flags
fn resolve_config(
    mut config: CacheConfig,
    script: &Script,
    grace_capacity: Option<usize>,
) -> CacheConfig {
    script.apply_config(&mut config);
    if let Some(capacity) = grace_capacity {
        config.grace_capacity = capacity;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::{resolve_config, CacheConfig, Script};

    #[test]
    fn script_config_overrides_env_defaults() {
        let script = Script::parse("config: { grace_capacity: 2 }\nsteps: []\n").unwrap();
        let env = CacheConfig::from_lookup(|name| {
            (name == "RESPOOL_GRACE_CAPACITY").then(|| "9".to_string())
        });
        let config = resolve_config(env, &script, None);
        assert_eq!(config.grace_capacity, 2);
    }

    #[test]
    fn cli_overrides_higher_priority_than_script() {
        let script = Script::parse("config: { grace_capacity: 2 }\nsteps: []\n").unwrap();
        let config = resolve_config(CacheConfig::default(), &script, Some(5));
        assert_eq!(config.grace_capacity, 5);
    }
}
