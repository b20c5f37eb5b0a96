//! Batch driver.
//!
//! Runs the solver over a dataset and streams records to a sink:
//! - Up to `concurrency` samples in flight via `StreamExt::buffered`
//! - Records reach the sink in dataset order regardless of completion order
//! - Metrics computed once every sample has finished
//! - Per-sample failures abort the batch or are skipped, per [`ErrorPolicy`]

use chrono::Local;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use thiserror::Error;

use reasonbench_core::{
    load_dataset, AnswerExtractor, DatasetError, Metrics, MetricsReport, ResultRecord, Sample,
};

use crate::config::{ConfigError, RunConfig};
use crate::output::{self, JsonlSink, OutputError, RecordSink};
use crate::providers::{ProviderError, ProviderRegistry};
use crate::solver::Solver;
use crate::strategies::{SolveError, StrategyRegistry};

/// Errors that end a batch.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Sample {index} (id {id}) failed: {source}")]
    Solve {
        index: usize,
        id: String,
        #[source]
        source: SolveError,
    },

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// What to do when a sample's strategy invocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the batch with the first failure
    #[default]
    Abort,

    /// Log, record the failure, and continue
    Skip,
}

/// A sample that produced no record.
#[derive(Debug, Clone, Serialize)]
pub struct SampleFailure {
    pub index: usize,
    pub id: JsonValue,
    pub error: String,
}

/// Result of a finished batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Records in dataset order
    pub records: Vec<ResultRecord>,

    /// Skipped samples (always empty under [`ErrorPolicy::Abort`])
    pub failures: Vec<SampleFailure>,

    pub metrics: Metrics,
}

/// Drives a [`Solver`] across many samples.
#[derive(Debug)]
pub struct BatchRunner {
    solver: Solver,
    concurrency: usize,
    on_error: ErrorPolicy,
}

impl BatchRunner {
    /// Runner with sequential execution and [`ErrorPolicy::Abort`].
    pub fn new(solver: Solver) -> Self {
        Self {
            solver,
            concurrency: 1,
            on_error: ErrorPolicy::Abort,
        }
    }

    pub fn builder(solver: Solver) -> BatchRunnerBuilder {
        BatchRunnerBuilder::new(solver)
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Solve every sample, writing each record to `sink` in dataset order.
    pub async fn run(
        &self,
        samples: &[Sample],
        sink: &dyn RecordSink,
    ) -> Result<BatchOutcome, RuntimeError> {
        let total = samples.len();
        let solver = &self.solver;

        let mut results = stream::iter(samples.iter().enumerate())
            .map(|(index, sample)| async move {
                tracing::info!(sample = index + 1, total, id = %sample.id, "Solving sample");
                (index, sample, solver.run_sample(sample).await)
            })
            .buffered(self.concurrency.max(1));

        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();

        while let Some((index, sample, result)) = results.next().await {
            match result {
                Ok(record) => {
                    sink.write(&record)?;
                    records.push(record);
                }
                Err(source) => match self.on_error {
                    ErrorPolicy::Abort => {
                        return Err(RuntimeError::Solve {
                            index,
                            id: sample.id.to_string(),
                            source,
                        });
                    }
                    ErrorPolicy::Skip => {
                        tracing::warn!(index, id = %sample.id, error = %source, "Skipping failed sample");
                        failures.push(SampleFailure {
                            index,
                            id: sample.id.clone(),
                            error: source.to_string(),
                        });
                    }
                },
            }
        }

        let metrics = Metrics::from_records(&records);
        Ok(BatchOutcome {
            records,
            failures,
            metrics,
        })
    }
}

/// Builder for [`BatchRunner`].
pub struct BatchRunnerBuilder {
    solver: Solver,
    concurrency: usize,
    on_error: ErrorPolicy,
}

impl BatchRunnerBuilder {
    pub fn new(solver: Solver) -> Self {
        Self {
            solver,
            concurrency: 1,
            on_error: ErrorPolicy::Abort,
        }
    }

    /// Samples in flight at once. Values below 1 run sequentially.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn build(self) -> BatchRunner {
        BatchRunner {
            solver: self.solver,
            concurrency: self.concurrency,
            on_error: self.on_error,
        }
    }
}

/// A completed run on disk.
#[derive(Debug)]
pub struct RunOutcome {
    /// The run folder holding the log and metrics files
    pub run_dir: PathBuf,

    pub report: MetricsReport,

    pub failures: Vec<SampleFailure>,
}

/// Execute a whole configured run: validate, load, solve, persist.
///
/// Configuration problems surface before the dataset is read or any model
/// is called.
pub async fn run_from_config(
    config: &RunConfig,
    providers: &ProviderRegistry,
    strategies: &StrategyRegistry,
) -> Result<RunOutcome, RuntimeError> {
    config.validate(strategies, providers)?;

    let strategy = config.build_strategy(strategies)?;
    let provider = providers.create(&config.model)?;
    if !provider.health_check().await {
        return Err(RuntimeError::Provider(ProviderError::NotConfigured(format!(
            "provider '{}' failed its health check",
            provider.name()
        ))));
    }
    let samples = load_dataset(&config.input_file, config.max_samples)?;

    let method = strategy.kind().to_string();
    tracing::info!(
        run = %config.run_name,
        method = %method,
        provider = %provider.name(),
        model = %config.model.model_name,
        samples = samples.len(),
        concurrency = config.concurrency,
        "Starting run"
    );

    let folder = output::run_folder_name(
        Local::now(),
        &config.run_name,
        &method,
        &config.model.model_type,
        &config.model.model_name,
    );
    let run_dir = output::create_run_folder(&config.output_dir, &folder)?;
    let sink = JsonlSink::create(run_dir.join(output::RECORDS_FILE))?;

    let solver = Solver::new(provider, strategy, AnswerExtractor::new(config.labels.clone()));
    let outcome = BatchRunner::builder(solver)
        .concurrency(config.concurrency)
        .on_error(config.on_error)
        .build()
        .run(&samples, &sink)
        .await?;

    let report = MetricsReport {
        run_name: config.run_name.clone(),
        method,
        data_file: config.input_file.display().to_string(),
        model_type: config.model.model_type.clone(),
        model_name: config.model.model_name.clone(),
        metrics: outcome.metrics,
    };
    output::write_metrics(&run_dir.join(output::METRICS_FILE), &report)?;

    tracing::info!(
        run = %config.run_name,
        accuracy = report.metrics.accuracy,
        scored = report.metrics.num_scored,
        correct = report.metrics.num_correct,
        total_tokens = ?report.metrics.total_token_usage.total_tokens,
        skipped = outcome.failures.len(),
        dir = %run_dir.display(),
        "Run finished"
    );

    Ok(RunOutcome {
        run_dir,
        report,
        failures: outcome.failures,
    })
}
