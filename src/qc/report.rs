//! Violation report: ordered, severity-tagged findings ready for display.

use crate::qc::rules::RuleFamily;
use chrono::NaiveDate;
use serde::Serialize;

/// Severity of a rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// Reject the run
    Red,
    /// Warning; inspect the run
    Yellow,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Red => "Red",
            Severity::Yellow => "Yellow",
        }
    }
}

/// A rule violation found in the series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub severity: Severity,
    pub rule: RuleFamily,
    /// Index into the standardized table rows
    pub row: usize,
    pub date: NaiveDate,
    /// Levels involved, in level order
    pub levels: Vec<String>,
    pub message: String,
}

/// A windowed rule that could not run because the series is too short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedRule {
    pub rule: RuleFamily,
    pub required: usize,
    pub actual: usize,
}

/// Renderable form of a violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub severity: Severity,
    pub label: &'static str,
    pub rule: &'static str,
    pub message: String,
}

/// Ordered result of a rule evaluation.
///
/// Order is the engine's scan order; entries are neither sorted nor
/// de-duplicated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QcReport {
    pub violations: Vec<Violation>,
    pub skipped_rules: Vec<SkippedRule>,
}

impl QcReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn red_count(&self) -> usize {
        self.count(Severity::Red)
    }

    pub fn yellow_count(&self) -> usize {
        self.count(Severity::Yellow)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    /// Violations of one rule family, in report order
    pub fn by_rule(&self, rule: RuleFamily) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.rule == rule)
    }

    /// Map every violation to a renderable entry, preserving order
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.violations
            .iter()
            .map(|v| ReportEntry {
                severity: v.severity,
                label: v.severity.label(),
                rule: v.rule.code(),
                message: v.message.clone(),
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries())
    }
}
