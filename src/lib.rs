//! # qc-oxide
//!
//! Multi-rule laboratory quality control over control-level series.
//!
//! Given a QC table (a date column plus `<analyte>-<level>` measurement
//! columns) and an analyte, the crate:
//!
//! - rescales every control level onto the reference level's mean/SD scale,
//! - derives the ±1/2/3 SD control limits of the reference level,
//! - scans the chronologically ordered series for Westgard-style violations,
//! - returns the findings as an ordered, severity-tagged report.
//!
//! Ingestion, charting and UI live outside this crate; they hand over a
//! polars `DataFrame` and render what [`qc::analyze`] returns.
//!
//! ```no_run
//! use polars::prelude::*;
//! use qc_oxide::{Dataset, QcConfig, qc};
//!
//! # fn run(frame: DataFrame) -> qc_oxide::Result<()> {
//! let dataset = Dataset::from_dataframe(frame)?;
//! let analysis = qc::analyze(&dataset, "GLU", None, &QcConfig::default())?;
//! for entry in analysis.report.entries() {
//!     println!("[{}] {}", entry.label, entry.message);
//! }
//! # Ok(())
//! # }
//! ```

// Crate-wide constants
pub mod constants;

// Error handling
pub mod error;

// Evaluation settings
pub mod config;

// Polars-backed table access and statistics
pub mod data;

// Selection, standardization, limits, rules and reporting
pub mod qc;

pub use config::QcConfig;
pub use data::{Dataset, LevelStats};
pub use error::{QcError, Result};
pub use qc::{QcAnalysis, analyze, analyze_all};
