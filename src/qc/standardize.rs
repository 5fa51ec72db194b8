//! Standardization of control levels onto the reference level's scale.
//!
//! Each level `L` is rescaled with
//! `ref_mean + (x - L.mean) * ref_sd / L.sd`, so a value sitting `z` SDs
//! from its own mean lands `z` reference SDs from the reference mean.

use crate::config::QcConfig;
use crate::constants::columns::STANDARDIZED_SUFFIX;
use crate::constants::standardize::MIN_ROWS;
use crate::data::stats::{LevelStats, calculate_stats_vec};
use crate::data::Dataset;
use crate::error::{QcError, Result};
use crate::qc::dates::{parse_date, sort_key};
use crate::qc::selector::LevelSelection;
use chrono::NaiveDate;
use log::{debug, warn};
use polars::prelude::*;
use serde::Serialize;

/// One kept row of the standardized table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcRow {
    /// Row index in the source dataset
    pub source_row: usize,
    pub date: NaiveDate,
    /// Date as written in the source
    pub label: String,
}

impl QcRow {
    /// `YYYY.MM.DD` key
    pub fn sort_key(&self) -> String {
        sort_key(self.date)
    }
}

/// A source row dropped because its date could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub value: String,
}

impl SkippedRow {
    pub fn to_error(&self) -> QcError {
        QcError::MalformedDate {
            row: self.row,
            value: self.value.clone(),
        }
    }
}

/// Raw and standardized values of one control level, aligned with the table rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSeries {
    pub name: String,
    pub raw: Vec<f64>,
    pub standardized: Vec<f64>,
    pub stats: LevelStats,
}

/// Chronologically sorted, null-free table of one analyte's levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardizedTable {
    pub date_column: String,
    pub rows: Vec<QcRow>,
    pub levels: Vec<LevelSeries>,
    /// Index into `levels` of the reference level
    pub reference: usize,
    pub reference_stats: LevelStats,
    pub skipped_rows: Vec<SkippedRow>,
}

impl StandardizedTable {
    /// Number of kept rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn reference_level(&self) -> &LevelSeries {
        &self.levels[self.reference]
    }

    pub fn level(&self, name: &str) -> Option<&LevelSeries> {
        self.levels.iter().find(|l| l.name == name)
    }

    /// Source row indices of the kept rows, in table order
    pub fn source_rows(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.source_row).collect()
    }

    /// Export date labels, raw levels and `<level>_std` columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let labels: Vec<&str> = self.rows.iter().map(|r| r.label.as_str()).collect();
        let mut columns = vec![Column::from(Series::new(
            self.date_column.as_str().into(),
            labels,
        ))];

        for level in &self.levels {
            columns.push(Column::from(Series::new(
                level.name.as_str().into(),
                level.raw.as_slice(),
            )));
            let std_name = format!("{}{}", level.name, STANDARDIZED_SUFFIX);
            columns.push(Column::from(Series::new(
                std_name.as_str().into(),
                level.standardized.as_slice(),
            )));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Rescale `value` of a level with `stats` onto the reference scale
pub fn standardize_value(value: f64, stats: &LevelStats, reference: &LevelStats) -> f64 {
    reference.mean + (value - stats.mean) * reference.std_dev / stats.std_dev
}

/// Build the standardized table for `selection`.
///
/// A row is kept only when every level is non-null on it and its date
/// parses. Rows with unreadable dates are listed in `skipped_rows`.
pub fn standardize(
    dataset: &Dataset,
    selection: &LevelSelection,
    config: &QcConfig,
) -> Result<StandardizedTable> {
    profiling::scope!("standardize");

    selection.check()?;

    let date_column = dataset.date_column();
    let dates = dataset.column_as_text(&date_column)?;
    let columns = selection
        .levels
        .iter()
        .map(|level| dataset.column_as_f64(level))
        .collect::<Result<Vec<_>>>()?;

    let mut kept: Vec<(QcRow, Vec<f64>)> = Vec::with_capacity(dataset.height());
    let mut skipped_rows = Vec::new();

    for row in 0..dataset.height() {
        let values: Option<Vec<f64>> = columns.iter().map(|col| col[row]).collect();
        let Some(values) = values else {
            debug!("row {}: missing level value, dropped", row);
            continue;
        };

        let text = dates[row].as_deref().unwrap_or("");
        match parse_date(row, text, &config.date_format) {
            Ok(date) => kept.push((
                QcRow {
                    source_row: row,
                    date,
                    label: text.trim().to_string(),
                },
                values,
            )),
            Err(e) => {
                warn!("{}, row skipped", e);
                skipped_rows.push(SkippedRow {
                    row,
                    value: text.to_string(),
                });
            }
        }
    }

    if kept.is_empty() {
        return Err(QcError::EmptyDataset {
            analyte: selection.analyte.clone(),
        });
    }
    if kept.len() < MIN_ROWS {
        return Err(QcError::InsufficientData {
            operation: "Standardization".to_string(),
            required: MIN_ROWS,
            actual: kept.len(),
        });
    }

    // Stable: same-day rows keep their source order
    kept.sort_by_key(|(row, _)| row.date);

    let mut levels = Vec::with_capacity(selection.levels.len());
    for (idx, name) in selection.levels.iter().enumerate() {
        let raw: Vec<f64> = kept.iter().map(|(_, values)| values[idx]).collect();
        let stats = calculate_stats_vec(&raw);
        if stats.is_degenerate() {
            return Err(QcError::DegenerateSeries {
                level: name.clone(),
                std_dev: stats.std_dev,
            });
        }
        levels.push(LevelSeries {
            name: name.clone(),
            raw,
            standardized: Vec::new(),
            stats,
        });
    }

    let reference_stats = levels[selection.reference].stats;
    for level in &mut levels {
        level.standardized = level
            .raw
            .iter()
            .map(|&x| standardize_value(x, &level.stats, &reference_stats))
            .collect();
    }

    debug!(
        "standardized {} rows of '{}' onto '{}' (mean {:.4}, sd {:.4})",
        kept.len(),
        selection.analyte,
        selection.reference_name(),
        reference_stats.mean,
        reference_stats.std_dev
    );

    Ok(StandardizedTable {
        date_column,
        rows: kept.into_iter().map(|(row, _)| row).collect(),
        levels,
        reference: selection.reference,
        reference_stats,
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qc::test_support::{dataset, selection, series_dataset};

    #[test]
    fn test_sorts_chronologically_across_years() {
        let ds = dataset(
            &["02.01.2024", "31.12.2023", "15.06.2023"],
            &[
                ("GLU-1", vec![Some(1.0), Some(2.0), Some(3.0)]),
                ("GLU-2", vec![Some(10.0), Some(20.0), Some(30.0)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "GLU"), &QcConfig::default()).unwrap();

        let keys: Vec<String> = table.rows.iter().map(|r| r.sort_key()).collect();
        assert_eq!(keys, vec!["2023.06.15", "2023.12.31", "2024.01.02"]);
        assert_eq!(table.levels[0].raw, vec![3.0, 2.0, 1.0]);
        assert_eq!(table.source_rows(), vec![2, 1, 0]);
    }

    #[test]
    fn test_rows_with_any_null_level_are_dropped() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024", "03.01.2024", "04.01.2024"],
            &[
                ("GLU-1", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
                ("GLU-2", vec![Some(10.0), None, Some(30.0), Some(40.0)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "GLU"), &QcConfig::default()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.levels[0].raw, vec![1.0, 4.0]);
        assert_eq!(table.levels[1].raw, vec![10.0, 40.0]);
        assert!(table.skipped_rows.is_empty());
    }

    #[test]
    fn test_malformed_dates_are_reported_and_skipped() {
        let ds = dataset(
            &["01.01.2024", "not a date", "03.01.2024", "04.01.2024"],
            &[
                ("GLU-1", vec![Some(1.0), Some(2.0), Some(3.0), Some(5.0)]),
                ("GLU-2", vec![Some(10.0), Some(20.0), Some(30.0), Some(35.0)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "GLU"), &QcConfig::default()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.skipped_rows,
            vec![SkippedRow {
                row: 1,
                value: "not a date".to_string()
            }]
        );
        assert!(matches!(
            table.skipped_rows[0].to_error(),
            QcError::MalformedDate { row: 1, .. }
        ));
    }

    #[test]
    fn test_degenerate_level_is_an_error() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024", "03.01.2024", "04.01.2024"],
            &[
                ("A-1", vec![Some(10.0), Some(10.0), Some(10.0), Some(10.0)]),
                ("A-2", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ],
        );
        let err = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap_err();
        assert!(matches!(err, QcError::DegenerateSeries { ref level, .. } if level == "A-1"));
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024"],
            &[
                ("A-1", vec![Some(1.0), None]),
                ("A-2", vec![Some(2.0), Some(3.0)]),
            ],
        );
        let err = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap_err();
        assert!(matches!(err, QcError::InsufficientData { actual: 1, .. }));
    }

    #[test]
    fn test_no_usable_rows() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024"],
            &[("A-1", vec![None, None]), ("A-2", vec![Some(2.0), Some(3.0)])],
        );
        let err = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap_err();
        assert!(matches!(err, QcError::EmptyDataset { .. }));
    }

    #[test]
    fn test_hand_built_selection_with_bad_reference() {
        let ds = series_dataset(&[("A-1", vec![1.0, 2.0, 3.0]), ("A-2", vec![4.0, 6.0, 5.0])]);
        let selection = LevelSelection {
            analyte: "A".to_string(),
            levels: vec!["A-1".to_string(), "A-2".to_string()],
            reference: 5,
        };
        assert_eq!(selection.reference_name(), "");

        let err = standardize(&ds, &selection, &QcConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            QcError::TooFewLevels {
                found: 2,
                required: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_level_mean_maps_to_reference_mean() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024", "03.01.2024", "04.01.2024"],
            &[
                ("A-1", vec![Some(1.0), Some(3.0), Some(2.0), Some(6.0)]),
                ("A-2", vec![Some(100.0), Some(104.0), Some(98.0), Some(101.0)]),
                ("A-3", vec![Some(0.5), Some(0.7), Some(0.4), Some(0.2)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap();
        let reference = table.reference_stats;

        assert_eq!(table.reference_level().name, "A-2");
        for level in &table.levels {
            assert_eq!(
                standardize_value(level.stats.mean, &level.stats, &reference),
                reference.mean
            );
        }
        // The reference level is unchanged by its own rescaling
        for (raw, std) in table.levels[1].raw.iter().zip(&table.levels[1].standardized) {
            assert!((raw - std).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reference_override() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024", "03.01.2024"],
            &[
                ("A-1", vec![Some(1.0), Some(2.0), Some(3.0)]),
                ("A-2", vec![Some(10.0), Some(20.0), Some(30.0)]),
            ],
        );
        let sel = LevelSelection::from_columns(&ds.column_names(), "A", 0).unwrap();
        let table = standardize(&ds, &sel, &QcConfig::default()).unwrap();
        assert_eq!(table.reference_stats.mean, 2.0);
        for (got, want) in table.levels[1].standardized.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_to_dataframe_columns() {
        let ds = dataset(
            &["01.01.2024", "02.01.2024", "03.01.2024"],
            &[
                ("A-1", vec![Some(1.0), Some(2.0), Some(3.0)]),
                ("A-2", vec![Some(10.0), Some(20.0), Some(30.0)]),
            ],
        );
        let table = standardize(&ds, &selection(&ds, "A"), &QcConfig::default()).unwrap();
        let frame = table.to_dataframe().unwrap();

        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Data", "A-1", "A-1_std", "A-2", "A-2_std"]);
        assert_eq!(frame.height(), 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn spread_series(len: usize) -> impl Strategy<Value = Vec<f64>> {
            prop::collection::vec(-1000.0f64..1000.0, len).prop_filter(
                "needs spread",
                |v| {
                    let min = v.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    max - min > 1e-3
                },
            )
        }

        proptest! {
            #[test]
            fn standardized_levels_share_reference_moments(
                (a, b) in (3usize..40).prop_flat_map(|n| (spread_series(n), spread_series(n)))
            ) {
                let ds = series_dataset(&[("X-1", a.clone()), ("X-2", b.clone())]);
                let table = standardize(&ds, &selection(&ds, "X"), &QcConfig::default()).unwrap();
                let reference = table.reference_stats;
                let rescaled = calculate_stats_vec(&table.levels[0].standardized);

                let tol = 1e-6 * (1.0 + reference.mean.abs() + reference.std_dev);
                prop_assert!((rescaled.mean - reference.mean).abs() < tol);
                prop_assert!((rescaled.std_dev - reference.std_dev).abs() < tol);
            }

            #[test]
            fn standardization_is_idempotent(
                (a, b) in (3usize..20).prop_flat_map(|n| (spread_series(n), spread_series(n)))
            ) {
                let ds = series_dataset(&[("X-1", a.clone()), ("X-2", b.clone())]);
                let sel = selection(&ds, "X");
                let first = standardize(&ds, &sel, &QcConfig::default()).unwrap();
                let second = standardize(&ds, &sel, &QcConfig::default()).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
