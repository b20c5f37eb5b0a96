//! reasonbench CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use reasonbench_core::{AnswerExtractor, LabelSet, Metrics};
use reasonbench_runtime::{
    output::read_records, run_from_config, ProviderRegistry, RunConfig, RunOverrides,
    StrategyRegistry,
};

#[derive(Parser)]
#[command(name = "reasonbench")]
#[command(about = "Evaluate LLM reasoning strategies on multiple-choice datasets", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch from a YAML config
    Run {
        /// Path to the run config
        #[arg(short, long)]
        config: PathBuf,

        /// Override the strategy (Direct, CoT, ReAct, Debate)
        #[arg(long)]
        method: Option<String>,

        /// Only run the first N samples
        #[arg(long)]
        max_samples: Option<usize>,

        /// Samples in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Override the output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the model name
        #[arg(long)]
        model: Option<String>,
    },

    /// Recompute metrics from a full_log.jsonl
    Score {
        /// Path to the record log
        log: PathBuf,
    },

    /// Run the answer extractor on text (stdin when omitted)
    Extract {
        text: Option<String>,

        /// Allowed labels
        #[arg(short, long, default_value = "ABCD")]
        labels: String,
    },

    /// List registered strategies and provider types
    List,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            method,
            max_samples,
            concurrency,
            output_dir,
            model,
        } => {
            let mut run_config = RunConfig::from_yaml_file(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            run_config.apply_overrides(RunOverrides {
                method_name: method,
                max_samples,
                concurrency,
                output_dir,
                model_name: model,
            });

            let outcome = run_from_config(
                &run_config,
                &ProviderRegistry::with_defaults(),
                &StrategyRegistry::with_defaults(),
            )
            .await?;

            println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            for failure in &outcome.failures {
                tracing::warn!(
                    index = failure.index,
                    id = %failure.id,
                    error = %failure.error,
                    "Sample skipped"
                );
            }
            tracing::info!(dir = %outcome.run_dir.display(), "Results written");
        }

        Commands::Score { log } => {
            let records =
                read_records(&log).with_context(|| format!("reading {}", log.display()))?;
            let metrics = Metrics::from_records(&records);
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }

        Commands::Extract { text, labels } => {
            let labels = LabelSet::parse(&labels)
                .with_context(|| format!("invalid label set '{}'", labels))?;
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };

            let extractor = AnswerExtractor::new(labels);
            let result = serde_json::json!({
                "choice": extractor.extract(&text),
                "final_answer": extractor.final_answer(&text),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::List => {
            println!("Strategies:");
            for key in StrategyRegistry::with_defaults().available() {
                println!("  {}", key);
            }
            println!("Providers:");
            for (name, description) in ProviderRegistry::with_defaults().describe() {
                println!("  {:<12} {}", name, description);
            }
        }
    }

    Ok(())
}
