//! Chemistry seam: molecule validation, canonicalisation and fingerprinting.
//!
//! Real cheminformatics toolkits plug in behind [`MoleculeValidator`]. The bundled
//! [`SmilesSyntaxValidator`] checks SMILES grammar and derives a hashed path
//! fingerprint from the parsed molecular graph.

mod smiles;

pub use smiles::{MolecularGraph, SmilesSyntaxValidator, parse_smiles};

use crate::core::models::fingerprint::Fingerprint;
use thiserror::Error;

/// Default fingerprint width used across the benchmark.
pub const DEFAULT_FINGERPRINT_BITS: usize = 512;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChemError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Malformed bracket atom at position {position}")]
    BracketAtom { position: usize },
    #[error("Bond at position {position} is not between two atoms")]
    DanglingBond { position: usize },
    #[error("Unbalanced or empty branch at position {position}")]
    Branch { position: usize },
    #[error("Ring closure {label} is invalid or never closed")]
    RingClosure { label: u32 },
    #[error("SMILES ends before the last atom is complete")]
    Truncated,
}

/// The result of checking one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub is_valid: bool,
    /// Canonical form, present only for valid molecules.
    pub canonical: Option<String>,
    /// All-zero for invalid molecules.
    pub fingerprint: Fingerprint,
}

/// Decides whether a molecule string is chemically valid and produces its fingerprint.
pub trait MoleculeValidator: Send + Sync {
    fn validate(&self, smiles: &str) -> Validation;

    /// Width of the fingerprints produced by [`validate`](Self::validate).
    fn fingerprint_bits(&self) -> usize;

    fn is_valid(&self, smiles: &str) -> bool {
        self.validate(smiles).is_valid
    }
}
