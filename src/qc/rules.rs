//! Multi-rule QC checks over a standardized table.
//!
//! Every rule family is a pure function over one level's series (or over
//! all levels on one date). The [`RuleEngine`] runs them all and merges the
//! hits into one deterministic scan order: date, then rule family, then
//! level, then level pair.

use crate::config::QcConfig;
use crate::constants::rules::*;
use crate::data::stats::LevelStats;
use crate::qc::report::{QcReport, Severity, SkippedRule, Violation};
use crate::qc::standardize::StandardizedTable;
use log::debug;
use serde::Serialize;

/// The closed set of rule families, declared in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RuleFamily {
    /// Two levels more than 4 reference SDs apart on the standardized scale, same date
    CrossLevelDivergence,
    /// Two or more levels beyond 2SD on the same side, same date
    SameDayExcursion,
    /// One point beyond 3SD
    Beyond3Sd,
    /// Two consecutive points beyond 2SD, same side
    Consecutive2Sd,
    /// Four consecutive points beyond 1SD, same side
    RunOf4Beyond1Sd,
    /// Ten consecutive points on one side of the mean
    RunOf10SameSide,
    /// Seven consecutive points steadily increasing or decreasing
    MonotonicRunOf7,
}

impl RuleFamily {
    pub const ALL: [RuleFamily; 7] = [
        RuleFamily::CrossLevelDivergence,
        RuleFamily::SameDayExcursion,
        RuleFamily::Beyond3Sd,
        RuleFamily::Consecutive2Sd,
        RuleFamily::RunOf4Beyond1Sd,
        RuleFamily::RunOf10SameSide,
        RuleFamily::MonotonicRunOf7,
    ];

    pub fn severity(self) -> Severity {
        match self {
            RuleFamily::CrossLevelDivergence
            | RuleFamily::SameDayExcursion
            | RuleFamily::Beyond3Sd
            | RuleFamily::Consecutive2Sd => Severity::Red,
            RuleFamily::RunOf4Beyond1Sd
            | RuleFamily::RunOf10SameSide
            | RuleFamily::MonotonicRunOf7 => Severity::Yellow,
        }
    }

    /// Westgard-style short code
    pub fn code(self) -> &'static str {
        match self {
            RuleFamily::CrossLevelDivergence => "R-4s",
            RuleFamily::SameDayExcursion => "2-2s/L",
            RuleFamily::Beyond3Sd => "1-3s",
            RuleFamily::Consecutive2Sd => "2-2s",
            RuleFamily::RunOf4Beyond1Sd => "4-1s",
            RuleFamily::RunOf10SameSide => "10-x",
            RuleFamily::MonotonicRunOf7 => "7-T",
        }
    }

    /// Consecutive points per level the rule looks at
    pub fn window(self) -> usize {
        match self {
            RuleFamily::CrossLevelDivergence
            | RuleFamily::SameDayExcursion
            | RuleFamily::Beyond3Sd => 1,
            RuleFamily::Consecutive2Sd => CONSECUTIVE_WINDOW,
            RuleFamily::RunOf4Beyond1Sd => RUN_BEYOND_WINDOW,
            RuleFamily::RunOf10SameSide => SAME_SIDE_WINDOW,
            RuleFamily::MonotonicRunOf7 => MONOTONIC_WINDOW,
        }
    }
}

/// Side of a level's mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Above,
    Below,
}

impl Side {
    fn word(self) -> &'static str {
        match self {
            Side::Above => "above",
            Side::Below => "below",
        }
    }

    fn sign(self) -> &'static str {
        match self {
            Side::Above => "+",
            Side::Below => "-",
        }
    }
}

/// Direction of a monotonic run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Increasing,
    Decreasing,
}

/// Which side `value` lies on when strictly beyond `k` SDs, if any.
///
/// With `k == 0` this is simply above or below the mean.
pub fn side_of(value: f64, stats: &LevelStats, k: f64) -> Option<Side> {
    if value > stats.bound(k) {
        Some(Side::Above)
    } else if value < stats.bound(-k) {
        Some(Side::Below)
    } else {
        None
    }
}

/// Runs of at least `window` consecutive points beyond `k` SDs on the same
/// side, reported once each at the end of the run's first full window.
///
/// With `window == 1` every point beyond `k` reports.
pub fn same_side_runs(
    values: &[f64],
    stats: &LevelStats,
    k: f64,
    window: usize,
) -> Vec<(usize, Side)> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }

    let sides: Vec<Option<Side>> = values.iter().map(|&v| side_of(v, stats, k)).collect();

    first_windows(window - 1..values.len(), window == 1, |end| {
        let run = &sides[end + 1 - window..=end];
        let first = run[0]?;
        run.iter().all(|s| *s == Some(first)).then_some(first)
    })
}

/// Keep the window ends where `matches` starts a new run: the previous window
/// did not match, or matched the other way. `every` reports all matches.
fn first_windows<T: Copy + PartialEq>(
    ends: std::ops::Range<usize>,
    every: bool,
    matches: impl Fn(usize) -> Option<T>,
) -> Vec<(usize, T)> {
    let mut hits = Vec::new();
    let mut previous = None;
    for end in ends {
        let current = matches(end);
        if let Some(found) = current {
            if every || previous != Some(found) {
                hits.push((end, found));
            }
        }
        previous = current;
    }
    hits
}

/// Runs of at least `window` consecutive points moving strictly in one
/// direction, reported once each at the end of the run's first full window
pub fn monotonic_runs(values: &[f64], window: usize) -> Vec<(usize, Trend)> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }

    // steps[i] is the move from values[i] to values[i + 1]
    let steps: Vec<Option<Trend>> = values
        .windows(2)
        .map(|w| {
            if w[1] > w[0] {
                Some(Trend::Increasing)
            } else if w[1] < w[0] {
                Some(Trend::Decreasing)
            } else {
                None
            }
        })
        .collect();

    first_windows(window - 1..values.len(), false, |end| {
        let run = &steps[end + 1 - window..end];
        let first = run[0]?;
        run.iter().all(|s| *s == Some(first)).then_some(first)
    })
}

/// A pair of levels diverging on one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergentPair {
    pub row: usize,
    pub first: usize,
    pub second: usize,
    pub difference: f64,
}

/// Pairs `(i, j)`, `i < j`, whose standardized values differ by more than
/// `threshold` on the same row. Rows first, then pairs in index order.
pub fn divergent_pairs(standardized: &[&[f64]], threshold: f64) -> Vec<DivergentPair> {
    let rows = standardized.iter().map(|s| s.len()).min().unwrap_or(0);
    let mut pairs = Vec::new();

    for row in 0..rows {
        for first in 0..standardized.len() {
            for second in first + 1..standardized.len() {
                let difference = (standardized[first][row] - standardized[second][row]).abs();
                if difference > threshold {
                    pairs.push(DivergentPair {
                        row,
                        first,
                        second,
                        difference,
                    });
                }
            }
        }
    }
    pairs
}

/// Rows where at least `min_levels` levels lie beyond `k` of their own SDs
/// on the same side. Above is reported before below on the same row.
pub fn same_day_excursions(
    raw: &[&[f64]],
    stats: &[LevelStats],
    k: f64,
    min_levels: usize,
) -> Vec<(usize, Side, Vec<usize>)> {
    let rows = raw.iter().map(|s| s.len()).min().unwrap_or(0);
    let mut hits = Vec::new();

    for row in 0..rows {
        for side in [Side::Above, Side::Below] {
            let levels: Vec<usize> = (0..raw.len())
                .filter(|&level| side_of(raw[level][row], &stats[level], k) == Some(side))
                .collect();
            if levels.len() >= min_levels {
                hits.push((row, side, levels));
            }
        }
    }
    hits
}

/// Runs every rule family over a standardized table
#[derive(Debug, Clone)]
pub struct RuleEngine {
    divergence_sd: f64,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self {
            divergence_sd: DEFAULT_DIVERGENCE_SD,
        }
    }
}

impl RuleEngine {
    pub fn new(config: &QcConfig) -> Self {
        Self {
            divergence_sd: config.divergence_sd,
        }
    }

    /// Evaluate all rule families and merge the hits in scan order
    pub fn evaluate(&self, table: &StandardizedTable) -> QcReport {
        profiling::scope!("evaluate_rules");

        let mut violations: Vec<Violation> = RuleFamily::ALL
            .iter()
            .flat_map(|&rule| self.check(rule, table))
            .collect();

        // Stable: keeps level and pair order within a (row, rule) bucket
        violations.sort_by_key(|v| (v.row, v.rule));

        let skipped_rules: Vec<SkippedRule> = RuleFamily::ALL
            .iter()
            .filter(|rule| rule.window() > table.len())
            .map(|&rule| SkippedRule {
                rule,
                required: rule.window(),
                actual: table.len(),
            })
            .collect();

        for skipped in &skipped_rules {
            debug!(
                "{} not evaluated: needs {} points, series has {}",
                skipped.rule.code(),
                skipped.required,
                skipped.actual
            );
        }

        QcReport {
            violations,
            skipped_rules,
        }
    }

    /// Run one rule family; hits come out level by level
    pub fn check(&self, rule: RuleFamily, table: &StandardizedTable) -> Vec<Violation> {
        match rule {
            RuleFamily::CrossLevelDivergence => self.check_divergence(table),
            RuleFamily::SameDayExcursion => check_same_day(table),
            RuleFamily::Beyond3Sd => check_runs(table, rule, ACTION_SD),
            RuleFamily::Consecutive2Sd => check_runs(table, rule, WARNING_SD),
            RuleFamily::RunOf4Beyond1Sd => check_runs(table, rule, RUN_SD),
            RuleFamily::RunOf10SameSide => check_runs(table, rule, 0.0),
            RuleFamily::MonotonicRunOf7 => check_trends(table),
        }
    }

    fn check_divergence(&self, table: &StandardizedTable) -> Vec<Violation> {
        let threshold = self.divergence_sd * table.reference_stats.std_dev;
        let series: Vec<&[f64]> = table
            .levels
            .iter()
            .map(|l| l.standardized.as_slice())
            .collect();

        divergent_pairs(&series, threshold)
            .into_iter()
            .map(|pair| {
                let first = &table.levels[pair.first].name;
                let second = &table.levels[pair.second].name;
                let message = format!(
                    "{}: {} and {} differ by {:.2} on the standardized scale (limit {:.2})",
                    table.rows[pair.row].label, first, second, pair.difference, threshold
                );
                violation(
                    table,
                    RuleFamily::CrossLevelDivergence,
                    pair.row,
                    &[pair.first, pair.second],
                    message,
                )
            })
            .collect()
    }
}

fn violation(
    table: &StandardizedTable,
    rule: RuleFamily,
    row: usize,
    levels: &[usize],
    message: String,
) -> Violation {
    Violation {
        severity: rule.severity(),
        rule,
        row,
        date: table.rows[row].date,
        levels: levels.iter().map(|&l| table.levels[l].name.clone()).collect(),
        message,
    }
}

fn check_same_day(table: &StandardizedTable) -> Vec<Violation> {
    let raw: Vec<&[f64]> = table.levels.iter().map(|l| l.raw.as_slice()).collect();
    let stats: Vec<LevelStats> = table.levels.iter().map(|l| l.stats).collect();

    same_day_excursions(&raw, &stats, WARNING_SD, SAME_DAY_MIN_LEVELS)
        .into_iter()
        .map(|(row, side, levels)| {
            let names: Vec<&str> = levels
                .iter()
                .map(|&l| table.levels[l].name.as_str())
                .collect();
            let message = format!(
                "{}: {} {} {}{}SD on the same day",
                table.rows[row].label,
                names.join(" and "),
                side.word(),
                side.sign(),
                WARNING_SD
            );
            violation(table, RuleFamily::SameDayExcursion, row, &levels, message)
        })
        .collect()
}

fn check_runs(table: &StandardizedTable, rule: RuleFamily, k: f64) -> Vec<Violation> {
    let window = rule.window();
    let mut hits = Vec::new();

    for (idx, level) in table.levels.iter().enumerate() {
        for (end, side) in same_side_runs(&level.raw, &level.stats, k, window) {
            let label = &table.rows[end].label;
            let message = match rule {
                RuleFamily::Beyond3Sd => format!(
                    "{}: {} value {} {} {}{}SD (limit {:.2})",
                    label,
                    level.name,
                    level.raw[end],
                    side.word(),
                    side.sign(),
                    k,
                    level.stats.bound(if side == Side::Above { k } else { -k })
                ),
                RuleFamily::RunOf10SameSide => format!(
                    "{}: {} {} consecutive values {} the mean",
                    label,
                    level.name,
                    window,
                    side.word()
                ),
                _ => format!(
                    "{}: {} {} consecutive values {} {}{}SD",
                    label,
                    level.name,
                    window,
                    side.word(),
                    side.sign(),
                    k
                ),
            };
            hits.push(violation(table, rule, end, &[idx], message));
        }
    }
    hits
}

fn check_trends(table: &StandardizedTable) -> Vec<Violation> {
    let window = RuleFamily::MonotonicRunOf7.window();
    let mut hits = Vec::new();

    for (idx, level) in table.levels.iter().enumerate() {
        for (end, trend) in monotonic_runs(&level.raw, window) {
            let direction = match trend {
                Trend::Increasing => "increasing",
                Trend::Decreasing => "decreasing",
            };
            let message = format!(
                "{}: {} {} consecutive {} values",
                table.rows[end].label, level.name, window, direction
            );
            hits.push(violation(
                table,
                RuleFamily::MonotonicRunOf7,
                end,
                &[idx],
                message,
            ));
        }
    }
    hits
}
