//! Prometheus metrics backend for the pixtag worker.
//!
//! [`PrometheusMetrics`] implements [`pixtag_core::MetricsBackend`]; the worker binary serves
//! [`PrometheusMetrics::encode_text`] on its `/metrics` endpoint.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use pixtag_core::{JobOutcome, MetricsBackend, MetricsHandle};
//! use pixtag_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//!
//! handle.record_job_started();
//! handle.record_job_completed(JobOutcome::Success, 420);
//! assert!(metrics.encode_text()?.contains("pixtag_jobs_completed_total"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `pixtag_jobs_started_total` - Counter
//! - `pixtag_jobs_completed_total{outcome}` - Counter
//! - `pixtag_job_duration_seconds{outcome}` - Histogram
//! - `pixtag_stage_errors_total{stage, error_kind}` - Counter
//! - `pixtag_images_resized_total` - Counter
mod backend;
pub use backend::PrometheusMetrics;
