//! # Engine Module
//!
//! This module drives metric computation for molecular generative models. It owns
//! everything between a loaded dataset and a finished metric outcome: talking to
//! the model server, caching its answers, computing distances and running the
//! metric engines themselves.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Modelability settings, benchmark plans and their builders
//! - **Result Cache** ([`cache`]) - In-memory and RocksDB-backed caches for model output
//! - **Inference** ([`inference`]) - The model client trait, the cached layer over it and the gRPC client
//! - **Distance Backends** ([`backend`]) - Serial and rayon-parallel pairwise distance matrices
//! - **Metrics** ([`metrics`]) - Sampling metrics, nearest-neighbour correlation, modelability and the registry
//! - **Run Context** ([`context`]) - The explicit bundle of services handed to every metric
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The umbrella error type for a benchmark run
//!
//! ## Key Capabilities
//!
//! - **Exactly-once inference** per distinct request across runs via the durable cache
//! - **Parallel distance computation** behind the `parallel` feature
//! - **Cross-validated grid search** over four regression families

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod inference;
pub mod metrics;
pub mod progress;
