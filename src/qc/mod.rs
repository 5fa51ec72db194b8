//! Multi-rule QC evaluation of one analyte's control levels
//!
//! Data flows leaf-first through the submodules:
//!
//! - [`selector`] picks the analyte's level columns and the reference level
//! - [`standardize`] filters, orders and rescales the levels
//! - [`limits`] derives the ±1/2/3 SD control lines
//! - [`rules`] scans the series for violations
//! - [`report`] holds the ordered findings
//!
//! [`analyze`] runs the whole chain for one analyte.

pub mod dates;
pub mod limits;
pub mod report;
pub mod rules;
pub mod selector;
pub mod standardize;

pub use limits::{ControlLimits, ControlLine, annotate, comparison_stats};
pub use report::{QcReport, ReportEntry, Severity, SkippedRule, Violation};
pub use rules::{RuleEngine, RuleFamily};
pub use selector::{LevelSelection, list_analytes, select_level_columns};
pub use standardize::{LevelSeries, StandardizedTable, standardize};

use crate::config::QcConfig;
use crate::data::Dataset;
use crate::error::Result;
use log::info;
use serde::Serialize;

/// Everything the presentation layer needs for one analyte
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcAnalysis {
    pub selection: LevelSelection,
    pub table: StandardizedTable,
    pub limits: ControlLimits,
    /// Control lines, +3SD down to -3SD, annotated when a comparison column was given
    pub lines: Vec<ControlLine>,
    pub report: QcReport,
}

/// Evaluate one analyte.
///
/// `comparison` names any column whose mean/SD should be shown next to the
/// control lines; `None` or an empty name means no annotation. It never
/// affects rule evaluation.
pub fn analyze(
    dataset: &Dataset,
    analyte: &str,
    comparison: Option<&str>,
    config: &QcConfig,
) -> Result<QcAnalysis> {
    profiling::scope!("analyze");

    let mut config = config.clone();
    config.validate();

    let selection =
        LevelSelection::from_columns(&dataset.column_names(), analyte, config.reference_level)?;
    info!(
        "analyzing '{}': {} levels, reference '{}'",
        analyte,
        selection.levels.len(),
        selection.reference_name()
    );

    let table = standardize(dataset, &selection, &config)?;
    let limits = ControlLimits::from_table(&table);

    let mut lines = limits.control_lines();
    if let Some(column) = comparison.map(str::trim).filter(|c| !c.is_empty()) {
        let stats = comparison_stats(dataset, &table, column)?;
        annotate(&mut lines, &stats, config.annotation_decimals);
    }

    let report = RuleEngine::new(&config).evaluate(&table);
    info!(
        "'{}': {} red, {} yellow over {} rows",
        analyte,
        report.red_count(),
        report.yellow_count(),
        table.len()
    );

    Ok(QcAnalysis {
        selection,
        table,
        limits,
        lines,
        report,
    })
}

/// Evaluate every analyte found in the dataset, in column order.
///
/// Each analyte succeeds or fails on its own.
pub fn analyze_all(
    dataset: &Dataset,
    comparison: Option<&str>,
    config: &QcConfig,
) -> Vec<(String, Result<QcAnalysis>)> {
    list_analytes(&dataset.column_names())
        .into_iter()
        .map(|analyte| {
            let analysis = analyze(dataset, &analyte, comparison, config);
            (analyte, analysis)
        })
        .collect()
}
