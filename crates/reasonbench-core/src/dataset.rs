//! Dataset loading and structural validation.
//!
//! Datasets are JSON files validated against `schemas/dataset.schema.json`
//! before any sample is handed to a strategy. A malformed file fails the whole
//! run up front.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::types::Sample;

/// Embedded dataset schema (loaded at compile time).
const DATASET_SCHEMA_JSON: &str = include_str!("../../../schemas/dataset.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Most schema violations reported in one error.
const MAX_REPORTED_ERRORS: usize = 10;

/// Errors from loading a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset {path} is malformed: {}", .errors.join("; "))]
    Malformed { path: String, errors: Vec<String> },

    #[error("Failed to load dataset schema: {0}")]
    Schema(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, DatasetError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(DATASET_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(DatasetError::Schema(e.clone())),
    }
}

/// Validate a dataset JSON value against the schema.
///
/// Returns the (capped) list of violations on failure.
pub fn validate_dataset_schema(value: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .take(MAX_REPORTED_ERRORS)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                format!("{} at top level", e)
            } else {
                format!("{} at {}", e, path)
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse and validate a dataset from a JSON string, keeping at most
/// `max_samples` records.
pub fn parse_dataset(json: &str, max_samples: Option<usize>) -> Result<Vec<Sample>, DatasetError> {
    parse_labeled(json, max_samples, "<inline>")
}

/// Load a dataset file, keeping at most `max_samples` records in file order.
pub fn load_dataset(
    path: impl AsRef<Path>,
    max_samples: Option<usize>,
) -> Result<Vec<Sample>, DatasetError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_labeled(&contents, max_samples, &path.display().to_string())
}

fn parse_labeled(
    json: &str,
    max_samples: Option<usize>,
    label: &str,
) -> Result<Vec<Sample>, DatasetError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    validate_dataset_schema(&value).map_err(|errors| DatasetError::Malformed {
        path: label.to_string(),
        errors,
    })?;

    let mut samples: Vec<Sample> = serde_json::from_value(value)?;
    if let Some(max) = max_samples {
        samples.truncate(max);
    }

    tracing::debug!(dataset = %label, samples = samples.len(), "Loaded dataset");
    Ok(samples)
}
