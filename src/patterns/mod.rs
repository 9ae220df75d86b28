/// Detector definitions and the built-in catalog
pub mod detector;

/// Detection over windowed entries
pub mod matcher;

pub use detector::{builtin_detectors, Detector, PatternCategory, PatternSeverity};
pub use matcher::{detect_patterns, Pattern, PatternSummary};
