//! Control limits around the reference level and the labelled lines drawn
//! from them.

use crate::constants::limits::LINE_MULTIPLIERS;
use crate::data::stats::{LevelStats, calculate_stats_opt};
use crate::data::Dataset;
use crate::error::Result;
use crate::qc::standardize::StandardizedTable;
use serde::Serialize;

/// The six ±1/2/3 SD limits around the reference mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlLimits {
    pub mean: f64,
    pub std_dev: f64,
    pub plus_3sd: f64,
    pub plus_2sd: f64,
    pub plus_1sd: f64,
    pub minus_1sd: f64,
    pub minus_2sd: f64,
    pub minus_3sd: f64,
}

impl ControlLimits {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        let limit = |k: f64| mean + k * std_dev;
        Self {
            mean,
            std_dev,
            plus_3sd: limit(3.0),
            plus_2sd: limit(2.0),
            plus_1sd: limit(1.0),
            minus_1sd: limit(-1.0),
            minus_2sd: limit(-2.0),
            minus_3sd: limit(-3.0),
        }
    }

    /// Limits of the table's reference level
    pub fn from_table(table: &StandardizedTable) -> Self {
        Self::new(table.reference_stats.mean, table.reference_stats.std_dev)
    }

    /// `mean + k * std_dev`; `k == 0` is the center line
    pub fn limit(&self, k: i32) -> f64 {
        match k {
            3 => self.plus_3sd,
            2 => self.plus_2sd,
            1 => self.plus_1sd,
            -1 => self.minus_1sd,
            -2 => self.minus_2sd,
            -3 => self.minus_3sd,
            0 => self.mean,
            _ => self.mean + k as f64 * self.std_dev,
        }
    }

    /// Limits ordered from -3SD to +3SD
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.minus_3sd,
            self.minus_2sd,
            self.minus_1sd,
            self.plus_1sd,
            self.plus_2sd,
            self.plus_3sd,
        ]
    }

    /// The seven drawn lines, +3SD down to -3SD
    pub fn control_lines(&self) -> Vec<ControlLine> {
        LINE_MULTIPLIERS
            .iter()
            .map(|&k| ControlLine {
                k,
                value: self.limit(k),
                label: tick_label(k),
                action: k.abs() == 3,
                annotation: None,
            })
            .collect()
    }
}

/// One horizontal control line with its axis tick label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlLine {
    pub k: i32,
    pub value: f64,
    pub label: String,
    /// ±3SD lines are action limits
    pub action: bool,
    /// Comparison-column value at the same k, when requested
    pub annotation: Option<String>,
}

fn tick_label(k: i32) -> String {
    if k == 0 {
        "X".to_string()
    } else {
        format!("{}SD", k)
    }
}

/// Round half to even at `decimals` places and render with exactly that many
pub fn format_rounded(value: f64, decimals: u32) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round_ties_even() / scale;
    format!("{:.*}", decimals as usize, rounded)
}

/// Statistics of any dataset column over the table's kept rows
pub fn comparison_stats(
    dataset: &Dataset,
    table: &StandardizedTable,
    column: &str,
) -> Result<LevelStats> {
    let values = dataset.column_as_f64(column)?;
    let kept: Vec<Option<f64>> = table
        .rows
        .iter()
        .map(|r| values.get(r.source_row).copied().flatten())
        .collect();
    Ok(calculate_stats_opt(&kept))
}

/// Attach `comparison.mean + k * comparison.std_dev` to every line
pub fn annotate(lines: &mut [ControlLine], comparison: &LevelStats, decimals: u32) {
    for line in lines.iter_mut() {
        let value = comparison.bound(line.k as f64);
        line.annotation = value
            .is_finite()
            .then(|| format_rounded(value, decimals));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QcConfig;
    use crate::error::QcError;
    use crate::qc::standardize::standardize;
    use crate::qc::test_support::{dataset, selection};
    use proptest::prelude::*;

    #[test]
    fn test_limits() {
        let limits = ControlLimits::new(100.0, 2.0);
        assert_eq!(limits.as_array(), [94.0, 96.0, 98.0, 102.0, 104.0, 106.0]);
        assert_eq!(limits.limit(0), 100.0);
        assert_eq!(limits.limit(-2), 96.0);
    }

    #[test]
    fn test_control_lines() {
        let lines = ControlLimits::new(10.0, 1.0).control_lines();
        let labels: Vec<&str> = lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["3SD", "2SD", "1SD", "X", "-1SD", "-2SD", "-3SD"]);
        assert_eq!(lines[0].value, 13.0);
        assert_eq!(lines[6].value, 7.0);
        assert!(lines[0].action && lines[6].action);
        assert!(!lines[3].action);
    }

    #[test]
    fn test_format_rounded() {
        assert_eq!(format_rounded(12.345678, 2), "12.35");
        assert_eq!(format_rounded(12.0, 2), "12.00");
        assert_eq!(format_rounded(7.5, 0), "8");
        assert_eq!(format_rounded(6.5, 0), "6");
        assert_eq!(format_rounded(5.125, 2), "5.12");
    }

    #[test]
    fn test_annotate() {
        let mut lines = ControlLimits::new(0.0, 1.0).control_lines();
        let comparison = LevelStats {
            mean: 5.0,
            std_dev: 0.125,
            count: 4,
        };
        annotate(&mut lines, &comparison, 2);
        let notes: Vec<&str> = lines
            .iter()
            .map(|l| l.annotation.as_deref().unwrap())
            .collect();
        assert_eq!(notes, vec!["5.38", "5.25", "5.12", "5.00", "4.88", "4.75", "4.62"]);
    }

    #[test]
    fn test_comparison_stats_use_kept_rows_only() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024", "03.01.2024", "04.01.2024"],
            &[
                ("A-1", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
                ("A-2", vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0)]),
                ("Lot", vec![Some(3.0), None, Some(1000.0), Some(5.0)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap();
        let stats = comparison_stats(&ds, &table, "Lot").unwrap();

        // Row 2 was dropped; row 1 is null in the comparison column
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 4.0);
    }

    #[test]
    fn test_comparison_column_must_exist() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024"],
            &[
                ("A-1", vec![Some(1.0), Some(2.0)]),
                ("A-2", vec![Some(10.0), Some(20.0)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap();
        let err = comparison_stats(&ds, &table, "B-1").unwrap_err();
        assert!(matches!(err, QcError::ColumnNotFound { .. }));
    }

    proptest! {
        #[test]
        fn limits_are_symmetric(mean in -1e4f64..1e4, sd in 1e-3f64..1e3) {
            let limits = ControlLimits::new(mean, sd);
            for k in 1..=3 {
                let sum = limits.limit(k) + limits.limit(-k);
                prop_assert!((sum - 2.0 * mean).abs() <= 1e-9 * (1.0 + mean.abs() + sd));
            }
        }
    }
}
