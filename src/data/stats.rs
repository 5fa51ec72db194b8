use polars::prelude::*;
use serde::Serialize;

/// Mean and sample standard deviation of one control level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelStats {
    pub mean: f64,
    pub std_dev: f64,
    /// Non-null observations the statistics were computed over
    pub count: usize,
}

impl Default for LevelStats {
    fn default() -> Self {
        Self {
            mean: f64::NAN,
            std_dev: f64::NAN,
            count: 0,
        }
    }
}

impl LevelStats {
    /// `mean + k * std_dev`
    pub fn bound(&self, k: f64) -> f64 {
        self.mean + k * self.std_dev
    }

    /// True when `value` lies strictly beyond `k` SDs on either side
    pub fn is_beyond(&self, value: f64, k: f64) -> bool {
        value > self.bound(k) || value < self.bound(-k)
    }

    /// Standard deviation is usable as a divisor
    pub fn is_degenerate(&self) -> bool {
        !self.std_dev.is_finite() || self.std_dev == 0.0
    }
}

/// Calculate mean and std dev (ddof=1) of a Series using polars; nulls are ignored
pub fn calculate_stats(series: &Series) -> LevelStats {
    let count = series.len() - series.null_count();

    if count == 0 {
        return LevelStats::default();
    }

    // Cast to f64 for numeric operations
    let series_f64 = match series.cast(&DataType::Float64) {
        Ok(s) => s,
        Err(_) => return LevelStats::default(),
    };

    let chunked = match series_f64.f64() {
        Ok(c) => c,
        Err(_) => return LevelStats::default(),
    };

    LevelStats {
        mean: chunked.mean().unwrap_or(f64::NAN),
        std_dev: chunked.std(1).unwrap_or(f64::NAN), // ddof=1 for sample std dev
        count,
    }
}

/// Calculate statistics from plain values
pub fn calculate_stats_vec(values: &[f64]) -> LevelStats {
    if values.is_empty() {
        return LevelStats::default();
    }

    let series = Series::new("level".into(), values);
    calculate_stats(&series)
}

/// Calculate statistics from nullable values, skipping the nulls
pub fn calculate_stats_opt(values: &[Option<f64>]) -> LevelStats {
    let series = Series::new("level".into(), values.to_vec());
    calculate_stats(&series)
}
