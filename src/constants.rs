//! Crate-wide constants and default values
//!
//! Rule windows and SD multipliers live here so the rule engine, the limit
//! calculator and the configuration agree on one set of numbers.

/// Multi-rule QC defaults
pub mod rules {
    /// SD multiplier for the single-point action rule
    pub const ACTION_SD: f64 = 3.0;

    /// SD multiplier for the consecutive and same-day warning rules
    pub const WARNING_SD: f64 = 2.0;

    /// SD multiplier for the run-of-4 rule
    pub const RUN_SD: f64 = 1.0;

    /// Default cross-level divergence threshold, in reference SDs
    pub const DEFAULT_DIVERGENCE_SD: f64 = 4.0;

    /// Minimum levels beyond 2SD on the same day (and side) to flag
    pub const SAME_DAY_MIN_LEVELS: usize = 2;

    /// Window lengths per windowed rule family
    pub const CONSECUTIVE_WINDOW: usize = 2;
    pub const RUN_BEYOND_WINDOW: usize = 4;
    pub const MONOTONIC_WINDOW: usize = 7;
    pub const SAME_SIDE_WINDOW: usize = 10;
}

/// Standardization defaults
pub mod standardize {
    /// Zero-based index of the reference level among the matched columns
    pub const DEFAULT_REFERENCE_LEVEL: usize = 1;

    /// Minimum number of levels for a comparison
    pub const MIN_LEVELS: usize = 2;

    /// Minimum kept rows for a sample standard deviation
    pub const MIN_ROWS: usize = 2;
}

/// Control line annotation defaults
pub mod limits {
    /// Multipliers for the drawn control lines, top to bottom
    pub const LINE_MULTIPLIERS: [i32; 7] = [3, 2, 1, 0, -1, -2, -3];

    /// Decimal places for comparison-column annotations
    pub const DEFAULT_ANNOTATION_DECIMALS: u32 = 2;

    /// Upper bound for annotation decimals
    pub const MAX_ANNOTATION_DECIMALS: u32 = 6;
}

/// Date parsing constants
pub mod datetime {
    /// Input date format (`DD.MM.YYYY`)
    pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

    /// Fallback for date columns already typed as dates
    pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

    /// Chronologically sortable display key (`YYYY.MM.DD`)
    pub const SORT_KEY_FORMAT: &str = "%Y.%m.%d";
}

/// Column naming conventions
pub mod columns {
    /// Separator between analyte and level in a column name
    pub const LEVEL_SEPARATOR: char = '-';

    /// Header prefix spreadsheets give to unnamed columns
    pub const UNNAMED_PREFIX: &str = "Unnamed:";

    /// Suffix for standardized columns in exported frames
    pub const STANDARDIZED_SUFFIX: &str = "_std";
}
