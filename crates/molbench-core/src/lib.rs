//! # MolBench Core Library
//!
//! Cache-aware inference and statistical quality metrics for benchmarking generative
//! molecular models.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that the expensive parts
//! (model inference) and the statistical parts (metrics) can be tested in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Dataset`, `SampleResult`,
//!   `Fingerprint`), the chemistry validation seam, pure statistics, regression
//!   estimators and file I/O (dataset loading, append-only record sinks).
//!
//! - **[`engine`]: The Logic Core.** The persistent result cache, the inference client
//!   abstraction and its cache-aware wrapper, the distance backends and the metric
//!   engines (sampling metrics, nearest-neighbor correlation, modelability).
//!
//! - **[`workflows`]: The Public API.** Drives the configured metrics over their
//!   variation space and appends one record per variation to the output sinks.

pub mod core;
pub mod engine;
pub mod workflows;
