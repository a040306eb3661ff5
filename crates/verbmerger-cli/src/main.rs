//! verbmerger: batched word merging from the command line.
//!
//! # Usage
//!
//! ```bash
//! printf 'Water | Add | Fire\nStone | Add | Mud\n' | verbmerger --batch-interval-ms 50
//! ```
//!
//! Every input line is answered with one JSON object on stdout, in input
//! order. Logs go to stderr.
//!
//! Environment variables can also be used:
//! - `VERBMERGER_MAX_BATCH_SIZE`: Maximum merges per model call
//! - `VERBMERGER_BATCH_INTERVAL_MS`: Longest wait before a partial batch is sent
//! - `VERBMERGER_CONFIG`: JSON settings file
//! - `RUST_LOG`: Log filter

mod client;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::future::join_all;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use verbmerger::config::MergerConfig;
use verbmerger::core::BatchCoalescer;
use verbmerger::merge::{
    BuiltinSeeder, InMemoryMergeRepository, MergeInput, MergeResultSeeder, MergerService,
    PromptBatchProcessor,
};
use verbmerger::observability::init_tracing;

use crate::client::RandomWordClient;

/// Merge `subject | verb | object` lines read from stdin.
#[derive(Parser, Debug, Clone)]
#[command(name = "verbmerger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum merges per model call (overrides the config file)
    #[arg(long, env = "VERBMERGER_MAX_BATCH_SIZE")]
    max_batch_size: Option<usize>,

    /// Longest wait in milliseconds before a partial batch is sent (overrides the config file)
    #[arg(long, env = "VERBMERGER_BATCH_INTERVAL_MS")]
    batch_interval_ms: Option<u64>,

    /// JSON settings file
    #[arg(short, long, env = "VERBMERGER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info,verbmerger=debug")]
    log_level: String,
}

impl Cli {
    /// Settings from the config file, if any, with command-line overrides applied.
    fn merger_config(&self) -> Result<MergerConfig> {
        let mut config = match &self.config {
            Some(path) => MergerConfig::from_json_file(path)?,
            None => MergerConfig::default(),
        };
        if let Some(max_batch_size) = self.max_batch_size {
            config.prompt_max_batch_size = max_batch_size;
        }
        if let Some(batch_interval_ms) = self.batch_interval_ms {
            config.prompt_batch_interval_ms = batch_interval_ms;
        }
        Ok(config)
    }
}

/// Parses one `subject | verb | object` line.
fn parse_input(line: &str) -> Result<MergeInput> {
    let words: Vec<&str> = line.split('|').map(str::trim).collect();
    let [subject, verb, object] = words[..] else {
        bail!("expected `subject | verb | object`, got {line:?}");
    };
    if words.iter().any(|word| word.is_empty()) {
        bail!("empty word in {line:?}");
    }
    Ok(MergeInput::new(subject, verb, object))
}

async fn read_lines() -> Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = Vec::new();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if !line.trim().is_empty() {
            out.push(line);
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.merger_config()?;
    let coalescer_config = config.coalescer_config()?;
    info!(
        max_batch_size = coalescer_config.max_batch_size(),
        batch_interval_ms = coalescer_config.batch_interval().as_millis() as u64,
        "starting"
    );

    let repository = Arc::new(InMemoryMergeRepository::with_seed(
        BuiltinSeeder.exemplar_seed()?,
    ));
    let processor = PromptBatchProcessor::new(RandomWordClient, Arc::clone(&repository), config);
    let service = Arc::new(MergerService::new(
        Arc::clone(&repository),
        BatchCoalescer::new(processor, coalescer_config),
    ));

    let lines = read_lines().await?;
    let handles = lines.into_iter().map(|line| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let record = match parse_input(&line) {
                Ok(input) => match service.get_output(input).await {
                    Ok(result) => json!({ "input": line, "result": result }),
                    Err(e) => json!({ "input": line, "error": e.to_string() }),
                },
                Err(e) => json!({ "input": line, "error": e.to_string() }),
            };
            record.to_string()
        })
    });

    let mut stdout = tokio::io::stdout();
    for handle in join_all(handles).await {
        let record = handle.context("merge task failed")?;
        stdout.write_all(record.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;

    let coalescer = service.prompter();
    coalescer.shutdown().await;
    let stats = coalescer.stats();
    info!(
        submitted = stats.submitted,
        batches = stats.dispatched,
        full = stats.full_triggers,
        timeout = stats.timeout_triggers,
        failed = stats.failed,
        mean_batch_size = stats.mean_batch_size(),
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["verbmerger"]).unwrap();
        let config = cli.merger_config().unwrap();
        assert_eq!(config, MergerConfig::default());
        assert_eq!(cli.log_level, "info,verbmerger=debug");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "verbmerger",
            "--max-batch-size",
            "4",
            "--batch-interval-ms",
            "25",
        ])
        .unwrap();
        let config = cli.merger_config().unwrap().coalescer_config().unwrap();
        assert_eq!(config.max_batch_size(), 4);
        assert_eq!(config.batch_interval().as_millis(), 25);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cli = Cli::try_parse_from(["verbmerger", "--max-batch-size", "0"]).unwrap();
        assert!(cli.merger_config().unwrap().coalescer_config().is_err());
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(
            parse_input(" Water |Add| Fire ").unwrap(),
            MergeInput::new("Water", "Add", "Fire")
        );
        assert!(parse_input("Water | Add").is_err());
        assert!(parse_input("Water | | Fire").is_err());
        assert!(parse_input("a | b | c | d").is_err());
    }
}
