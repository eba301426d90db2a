// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hdds-qos - Check QoS policy expressions and watch discovered QoS
//!
//! ```bash
//! # Which policies each entity kind keeps
//! hdds-qos check -q Durability.TransientLocal -q History.KeepLast 10
//!
//! # Only the writer, with a config file providing defaults
//! hdds-qos check --entity writer --config qos.toml -q OwnershipStrength 5
//!
//! # Replay recorded discovery polls and print QoS changes
//! hdds-qos watch --records polls.jsonl --kind publication
//! ```

mod output;
mod replay;

use anyhow::bail;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::*;
use hdds_qos_lang::expression::is_valid_delimiter;
use hdds_qos_lang::{
    group_occurrences, qos_help_message, DiscoveryKind, EntitySelector, QosConfig, Watcher,
};
use replay::ReplaySource;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hdds-qos")]
#[command(about = "Check QoS policy expressions per entity kind and watch discovered QoS changes")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse QoS expressions and show the policies each entity keeps
    Check {
        /// QoS expression(s), e.g. `-q History.KeepLast 10`; each `-q` starts a new one
        #[arg(short = 'q', long = "qos", num_args = 1.., allow_hyphen_values = true)]
        qos: Vec<String>,

        /// Target entity: topic, publisher, subscriber, writer, reader or all
        #[arg(short, long, default_value = "all")]
        entity: EntitySelector,

        /// Argument delimiter for flat policies
        #[arg(long)]
        delimiter: Option<char>,

        /// TOML configuration with default expressions
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List every known policy and its arguments
    Policies,

    /// Replay discovery polls and report QoS changes
    Watch {
        /// JSON lines file, one array of entity records per poll
        #[arg(short, long, value_name = "FILE")]
        records: PathBuf,

        /// Discovery kind(s) to watch (default: all)
        #[arg(short, long)]
        kind: Vec<DiscoveryKind>,

        /// Pause between polls in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// TOML configuration with watch settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print one JSON report per poll
        #[arg(long)]
        json: bool,

        /// Process the first poll only
        #[arg(long)]
        once: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            qos: _,
            entity,
            delimiter,
            config,
            json,
        } => {
            let qos = qos_occurrences(&matches);
            cmd_check(&qos, entity, delimiter, config.as_deref(), json)
        }
        Commands::Policies => {
            println!("{}", qos_help_message());
            Ok(())
        }
        Commands::Watch {
            records,
            kind,
            interval_ms,
            config,
            json,
            once,
        } => cmd_watch(&records, kind, interval_ms, config.as_deref(), json, once),
    }
}

/// Tokens of every `-q` occurrence of `check`, one list per occurrence.
fn qos_occurrences(matches: &ArgMatches) -> Vec<Vec<String>> {
    let Some(occurrences) = matches
        .subcommand_matches("check")
        .and_then(|m| m.get_occurrences::<String>("qos"))
    else {
        return Vec::new();
    };

    let mut grouped: Vec<Vec<String>> = Vec::new();
    for values in occurrences {
        grouped.push(Vec::new());
        for value in values {
            // With hyphen values allowed, a later `-q` can land among the values.
            if value == "-q" || value == "--qos" {
                grouped.push(Vec::new());
            } else if let Some(rest) = value.strip_prefix("--qos=") {
                grouped.push(vec![rest.to_string()]);
            } else if let Some(current) = grouped.last_mut() {
                current.push(value.clone());
            }
        }
    }
    grouped.retain(|tokens| !tokens.is_empty());
    grouped
}

fn load_config(path: Option<&Path>) -> anyhow::Result<QosConfig> {
    let config = match path {
        Some(path) => QosConfig::from_file(path)?,
        None => QosConfig::default(),
    };
    Ok(config)
}

fn cmd_check(
    qos: &[Vec<String>],
    entity: EntitySelector,
    delimiter: Option<char>,
    config_path: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(delimiter) = delimiter {
        if !is_valid_delimiter(delimiter) {
            bail!("Delimiter '{}' is reserved", delimiter);
        }
        config.delimiter = delimiter;
    }
    if qos.is_empty() && config_path.is_none() {
        bail!("No QoS expressions given (use -q or --config)");
    }

    let expressions = group_occurrences(qos, &config.parse_options());
    match entity {
        EntitySelector::All => config.qos.all.extend(expressions),
        EntitySelector::Only(kind) => config.qos.for_kind_mut(kind).extend(expressions),
    }

    let entity_qos = config.build()?;
    let kinds = entity.kinds();

    if json {
        let value = output::entity_qos_json(&entity_qos, &kinds, config.delimiter);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for warning in output::format_dropped(&entity_qos, &kinds) {
        eprintln!("{}", warning);
    }
    print!("{}", output::format_entity_qos(&entity_qos, &kinds, config.delimiter));
    Ok(())
}

fn cmd_watch(
    records: &Path,
    kinds: Vec<DiscoveryKind>,
    interval_ms: Option<u64>,
    config_path: Option<&Path>,
    json: bool,
    once: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if !kinds.is_empty() {
        config.watch.kinds = kinds;
    }
    if let Some(interval_ms) = interval_ms {
        config.watch.interval_ms = interval_ms;
    }
    config.validate()?;

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let source = ReplaySource::open(records)?;
    let mut watcher = Watcher::new(source)
        .with_kinds(config.watch.kinds.clone())
        .with_interval(config.poll_interval());
    tracing::debug!("{} more recorded polls queued", watcher.source_mut().remaining_polls());

    if !json {
        eprintln!(
            "{} Watching {} (every {:?}, Ctrl+C to stop)",
            ">>>".green().bold(),
            records.display(),
            config.poll_interval()
        );
    }

    let print = |report: &hdds_qos_lang::PollReport| {
        if json {
            match serde_json::to_string(report) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!("Failed to encode report: {}", e),
            }
        } else {
            for line in output::format_report(report) {
                println!("{}", line);
            }
        }
    };

    if once {
        let report = watcher.poll_once();
        print(&report);
    } else {
        let cycles = watcher.run(&running, print);
        tracing::info!(
            "Processed {} polls, tracking {} entities",
            cycles,
            watcher.snapshot().len()
        );
    }
    Ok(())
}
