//! # Workflows Module
//!
//! High-level entry points that run a complete benchmark from a prepared plan.
//!
//! - **Benchmark Workflow** ([`benchmark`]) - Evaluates every metric variation of a
//!   [`BenchmarkPlan`](crate::engine::config::BenchmarkPlan), stamps run metadata
//!   onto each outcome and streams the records to the configured sinks.
//! - **Cache Warm** ([`warm`]) - Issues every sampling and embedding request of a
//!   plan ahead of time so the benchmark itself runs from the result cache.

pub mod benchmark;
pub mod warm;
