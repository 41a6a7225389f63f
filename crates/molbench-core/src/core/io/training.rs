use crate::core::models::training::{SmilesSet, TrainingSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TrainingSetError {
    #[error("I/O error for training set '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
}

/// Reads training molecules either from a CSV column or, when `smiles_column` is
/// `None`, from a plain list with one SMILES per line.
pub fn read_from(
    reader: impl Read,
    smiles_column: Option<&str>,
) -> Result<SmilesSet, TrainingSetError> {
    let mut set = SmilesSet::new();
    match smiles_column {
        Some(column) => {
            let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
            let idx = csv_reader
                .headers()?
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| TrainingSetError::MissingColumn(column.to_string()))?;
            for record in csv_reader.records() {
                if let Some(smiles) = record?.get(idx).filter(|s| !s.is_empty()) {
                    set.insert(smiles);
                }
            }
        }
        None => {
            for line in BufReader::new(reader).lines() {
                let line = line.map_err(|source| TrainingSetError::Io {
                    path: PathBuf::from("<reader>"),
                    source,
                })?;
                let smiles = line.trim();
                if !smiles.is_empty() {
                    set.insert(smiles);
                }
            }
        }
    }
    Ok(set)
}

pub fn read_from_path(
    path: &Path,
    smiles_column: Option<&str>,
) -> Result<SmilesSet, TrainingSetError> {
    let file = File::open(path).map_err(|source| TrainingSetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let set = read_from(file, smiles_column)?;
    info!(path = %path.display(), molecules = set.len(), "Loaded training set.");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_lists_skipping_blank_lines() {
        let set = read_from("CCO\n\n  CCC \n".as_bytes(), None).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("CCC"));
    }

    #[test]
    fn reads_csv_column() {
        let set = read_from("id,smiles\n1,CCO\n2,CCN\n".as_bytes(), Some("smiles")).unwrap();
        assert!(set.contains("CCO") && set.contains("CCN"));
        assert!(!set.contains("1"));
    }

    #[test]
    fn missing_csv_column_is_an_error() {
        let err = read_from("id\n1\n".as_bytes(), Some("smiles")).unwrap_err();
        assert!(matches!(err, TrainingSetError::MissingColumn(_)));
    }
}
