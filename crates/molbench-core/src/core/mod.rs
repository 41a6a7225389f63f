//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Embeddings, sample results, chemical fingerprints,
//!   datasets, training sets and metric records
//! - **Chemistry Seam** ([`chem`]) - Molecule validation and fingerprinting behind a trait
//! - **Statistics** ([`stats`]) - Ranking, rank correlation, scaling and error measures
//! - **Regression** ([`regression`]) - Estimator families, parameter grids, k-fold
//!   cross-validation and grid search
//! - **File I/O** ([`io`]) - Dataset and training-set loading, append-only record sinks
//!
//! Everything in this module is free of hidden state: datasets are read-only once
//! loaded and estimators are plain values that are fitted and queried explicitly.

pub mod chem;
pub mod io;
pub mod models;
pub mod regression;
pub mod stats;
