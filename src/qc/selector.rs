//! Column selection: which columns are an analyte's control levels, and
//! which of them anchors the standardized scale.

use crate::constants::columns::{LEVEL_SEPARATOR, UNNAMED_PREFIX};
use crate::constants::standardize::MIN_LEVELS;
use crate::error::{QcError, Result};
use serde::Serialize;

/// The control levels of one analyte plus the chosen reference level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSelection {
    pub analyte: String,
    /// Level column names in dataset order
    pub levels: Vec<String>,
    /// Index into `levels` of the reference level
    pub reference: usize,
}

impl LevelSelection {
    /// Build a selection, checking that `reference` names an existing level
    pub fn new(analyte: &str, levels: Vec<String>, reference: usize) -> Result<Self> {
        let selection = Self {
            analyte: analyte.to_string(),
            levels,
            reference,
        };
        selection.check()?;
        Ok(selection)
    }

    /// Fails when there are fewer than two levels or `reference` is out of range
    pub fn check(&self) -> Result<()> {
        let required = MIN_LEVELS.max(self.reference.saturating_add(1));
        if self.levels.len() < required {
            return Err(QcError::TooFewLevels {
                analyte: self.analyte.clone(),
                found: self.levels.len(),
                required,
            });
        }
        Ok(())
    }

    /// Select the analyte's level columns from `columns` (date column first)
    pub fn from_columns(columns: &[String], analyte: &str, reference: usize) -> Result<Self> {
        let levels = select_level_columns(columns, analyte)?;
        Self::new(analyte, levels, reference)
    }

    /// Name of the reference level column
    pub fn reference_name(&self) -> &str {
        self.levels
            .get(self.reference)
            .map_or("", String::as_str)
    }
}

/// Columns named `<analyte>-...`, in dataset order.
///
/// The first column is the date column and never matches.
pub fn select_level_columns(columns: &[String], analyte: &str) -> Result<Vec<String>> {
    let prefix = format!("{}{}", analyte, LEVEL_SEPARATOR);

    let levels: Vec<String> = columns
        .iter()
        .skip(1)
        .filter(|name| !analyte.is_empty() && name.starts_with(&prefix))
        .cloned()
        .collect();

    if levels.is_empty() {
        return Err(QcError::NoMatchingColumns {
            analyte: analyte.to_string(),
        });
    }
    Ok(levels)
}

/// Distinct analyte names found in the measurement columns, first-seen order.
///
/// Placeholder headers (`Unnamed: 3`) and names without a level separator
/// are not analytes.
pub fn list_analytes(columns: &[String]) -> Vec<String> {
    let mut analytes: Vec<String> = Vec::new();
    for name in columns.iter().skip(1) {
        if name.starts_with(UNNAMED_PREFIX) {
            continue;
        }
        let Some((analyte, _)) = name.split_once(LEVEL_SEPARATOR) else {
            continue;
        };
        if !analyte.is_empty() && !analytes.iter().any(|a| a == analyte) {
            analytes.push(analyte.to_string());
        }
    }
    analytes
}
