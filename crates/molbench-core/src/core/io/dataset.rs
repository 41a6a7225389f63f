use crate::core::chem::MoleculeValidator;
use crate::core::models::ModelError;
use crate::core::models::dataset::{Dataset, PropertyColumn};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error for dataset file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
    #[error("Invalid value '{value}' in column '{column}' on row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Where a dataset lives and how to interpret its columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSpec {
    pub name: String,
    pub path: PathBuf,
    pub smiles_column: String,
    pub properties: Vec<String>,
    pub max_seq_len: Option<usize>,
    /// Drop molecules the validator rejects; otherwise keep them with a zero fingerprint.
    pub remove_invalid: bool,
}

impl DatasetSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            smiles_column: "canonical_smiles".to_string(),
            properties: Vec::new(),
            max_seq_len: None,
            remove_invalid: true,
        }
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
}

/// Reads a dataset from CSV text with a header row.
///
/// Valid molecules are stored in canonical form with their fingerprints.
pub fn read_from(
    reader: impl Read,
    spec: &DatasetSpec,
    validator: &dyn MoleculeValidator,
) -> Result<Dataset, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let smiles_idx = column_index(&headers, &spec.smiles_column)?;
    let property_idx = spec
        .properties
        .iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut smiles = Vec::new();
    let mut fingerprints = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); spec.properties.len()];
    let mut dropped = 0usize;

    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let raw = record.get(smiles_idx).unwrap_or_default();
        let validation = validator.validate(raw);
        if !validation.is_valid && spec.remove_invalid {
            dropped += 1;
            continue;
        }
        for (column, (&idx, name)) in property_idx.iter().zip(&spec.properties).enumerate() {
            let text = record.get(idx).unwrap_or_default();
            let value = text.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
                column: name.clone(),
                row: row + 1,
                value: text.to_string(),
            })?;
            values[column].push(value);
        }
        smiles.push(validation.canonical.unwrap_or_else(|| raw.to_string()));
        fingerprints.push(validation.fingerprint);
    }

    if dropped > 0 {
        warn!(
            dataset = %spec.name,
            dropped,
            "Dropped molecules that failed validation."
        );
    }

    let properties = spec
        .properties
        .iter()
        .cloned()
        .zip(values)
        .map(|(name, values)| PropertyColumn { name, values })
        .collect();
    let dataset = Dataset::new(&spec.name, smiles, fingerprints, properties, spec.max_seq_len)?;
    info!(
        dataset = %dataset.name(),
        molecules = dataset.len(),
        max_seq_len = dataset.max_seq_len(),
        "Loaded dataset."
    );
    Ok(dataset)
}

pub fn read_from_path(
    spec: &DatasetSpec,
    validator: &dyn MoleculeValidator,
) -> Result<Dataset, DatasetError> {
    let file = File::open(&spec.path).map_err(|source| DatasetError::Io {
        path: spec.path.clone(),
        source,
    })?;
    read_from(file, spec, validator)
}
