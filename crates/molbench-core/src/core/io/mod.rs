//! Provides the file boundary of the benchmark.
//!
//! Datasets and training sets are read from CSV (or plain SMILES lists); metric
//! records leave through append-only [`sink::RecordSink`] implementations.

pub mod dataset;
pub mod sink;
pub mod training;
