pub mod dataset;
pub mod stats;

// Re-export key types for convenience
pub use dataset::Dataset;
pub use stats::LevelStats;
