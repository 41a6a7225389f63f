use super::ModelError;
use super::fingerprint::Fingerprint;

/// A named column of numeric molecular properties (for example a measured solubility).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// A benchmark dataset: molecules, their fingerprints and optional property columns.
///
/// Datasets are read-only once built; every column is aligned with `smiles`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    smiles: Vec<String>,
    fingerprints: Vec<Fingerprint>,
    properties: Vec<PropertyColumn>,
    max_seq_len: usize,
}

impl Dataset {
    /// Builds a dataset, checking that every column has one entry per molecule.
    ///
    /// `max_seq_len` defaults to the length of the longest SMILES string.
    pub fn new(
        name: impl Into<String>,
        smiles: Vec<String>,
        fingerprints: Vec<Fingerprint>,
        properties: Vec<PropertyColumn>,
        max_seq_len: Option<usize>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        let expected = smiles.len();
        if fingerprints.len() != expected {
            return Err(ModelError::ColumnLength {
                dataset: name,
                column: "fingerprint".to_string(),
                expected,
                found: fingerprints.len(),
            });
        }
        if let Some(first) = fingerprints.first() {
            if let Some(bad) = fingerprints.iter().find(|fp| fp.n_bits() != first.n_bits()) {
                return Err(ModelError::FingerprintWidth {
                    dataset: name,
                    expected: first.n_bits(),
                    found: bad.n_bits(),
                });
            }
        }
        for column in &properties {
            if column.values.len() != expected {
                return Err(ModelError::ColumnLength {
                    dataset: name,
                    column: column.name.clone(),
                    expected,
                    found: column.values.len(),
                });
            }
        }
        let max_seq_len = max_seq_len
            .unwrap_or_else(|| smiles.iter().map(String::len).max().unwrap_or(0));
        Ok(Self {
            name,
            smiles,
            fingerprints,
            properties,
            max_seq_len,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn smiles(&self) -> &[String] {
        &self.smiles
    }

    pub fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    pub fn properties(&self) -> &[PropertyColumn] {
        &self.properties
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn len(&self) -> usize {
        self.smiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smiles.is_empty()
    }

    /// The property column, if the dataset has exactly one.
    pub fn single_property(&self) -> Option<&PropertyColumn> {
        match self.properties.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}
