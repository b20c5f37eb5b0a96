//! # reasonbench-runtime
//!
//! Async side of reasonbench: model providers, the reasoning strategies,
//! and the batch driver that runs a strategy over a dataset.
//!
//! The deterministic pieces (extraction, templates, metrics) live in
//! `reasonbench-core`; this crate only adds what needs a model or a runtime.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reasonbench_runtime::{run_from_config, ProviderRegistry, RunConfig, StrategyRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::from_yaml_file("configs/example.yaml")?;
//! let outcome = run_from_config(
//!     &config,
//!     &ProviderRegistry::with_defaults(),
//!     &StrategyRegistry::with_defaults(),
//! )
//! .await?;
//! println!("accuracy: {:.3}", outcome.report.metrics.accuracy);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod orchestrator;
pub mod output;
pub mod prompts;
pub mod providers;
pub mod solver;
pub mod strategies;

pub use config::{ConfigError, MethodConfig, ModelConfig, RunConfig, RunOverrides};
pub use orchestrator::{
    run_from_config, BatchOutcome, BatchRunner, BatchRunnerBuilder, ErrorPolicy, RunOutcome,
    RuntimeError, SampleFailure,
};
pub use output::{JsonlSink, MemorySink, OutputError, RecordSink};
pub use providers::{
    GenerationConfig, LlmProvider, ProviderError, ProviderRegistry, RetryingProvider,
    ScriptedProvider,
};
pub use solver::Solver;
pub use strategies::{
    DebateRole, SolveError, Strategy, StrategyKind, StrategyRegistry, StrategySettings,
};
