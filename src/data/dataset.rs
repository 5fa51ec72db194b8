use crate::error::{QcError, Result};
use polars::prelude::*;

/// Dataset wraps the in-memory QC table handed over by the ingestion layer.
///
/// Column 0 is the date column; every other column is a candidate
/// measurement column. Row order carries no meaning.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    /// Create a Dataset from an already-loaded DataFrame
    pub fn from_dataframe(frame: DataFrame) -> Result<Self> {
        if frame.width() == 0 {
            return Err(QcError::ColumnNotFound {
                column: "date".to_string(),
            });
        }
        Ok(Self { frame })
    }

    /// Get a reference to the underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.frame
    }

    /// Get all column names in source order
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Name of the date column (always the first one)
    pub fn date_column(&self) -> String {
        self.column_names().into_iter().next().unwrap_or_default()
    }

    /// Get the number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Get column values as a Series
    pub fn column_values(&self, col: &str) -> Result<Series> {
        self.frame
            .column(col)
            .map(|c| c.as_materialized_series().clone())
            .map_err(|_| QcError::ColumnNotFound {
                column: col.to_string(),
            })
    }

    /// Get a column's numeric values.
    ///
    /// Nulls, unparsable text and non-finite floats all come back as `None`.
    pub fn column_as_f64(&self, col: &str) -> Result<Vec<Option<f64>>> {
        let series = self.column_values(col)?;

        let values: Vec<Option<f64>> = match series.cast(&DataType::Float64) {
            Ok(s) => s.f64()?.into_iter().collect(),
            Err(_) => {
                let str_series = series.cast(&DataType::String)?;
                str_series
                    .str()?
                    .into_iter()
                    .map(|opt| opt.and_then(|s| s.trim().parse::<f64>().ok()))
                    .collect()
            }
        };

        Ok(values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }

    /// Get a column's values as text; date-typed columns render as `YYYY-MM-DD`
    pub fn column_as_text(&self, col: &str) -> Result<Vec<Option<String>>> {
        let series = self.column_values(col)?;
        let str_series = series.cast(&DataType::String)?;
        Ok(str_series
            .str()?
            .into_iter()
            .map(|opt| opt.map(str::to_string))
            .collect())
    }
}
