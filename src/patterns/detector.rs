//! Named regular-expression detectors and the built-in catalog

use crate::error::PatternError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Maximum compiled regex size for detectors, including configured ones
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// How serious a detected pattern is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    High,
    Medium,
    Low,
}

/// Area of the system a pattern points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    Authentication,
    Database,
    Network,
    System,
    Business,
}

/// A named, case-insensitive regular expression over log messages
#[derive(Debug, Clone)]
pub struct Detector {
    name: String,
    regex: Regex,
    severity: PatternSeverity,
    category: PatternCategory,
}

impl Detector {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        severity: PatternSeverity,
        category: PatternCategory,
    ) -> Result<Self, PatternError> {
        let name = name.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|source| PatternError::InvalidRegex {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            regex,
            severity,
            category,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text of the regular expression
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn severity(&self) -> PatternSeverity {
        self.severity
    }

    pub fn category(&self) -> PatternCategory {
        self.category
    }

    pub fn is_match(&self, message: &str) -> bool {
        self.regex.is_match(message)
    }
}

// Catalog order is significant only for ties in the sorted output
static BUILTIN_DETECTORS: LazyLock<Vec<Detector>> = LazyLock::new(|| {
    use PatternCategory::*;
    use PatternSeverity::*;

    [
        (
            "Database Connection Failures",
            r"connection.*timeout|connection.*failed|database.*unavailable",
            High,
            Database,
        ),
        (
            "Authentication Errors",
            r"auth.*failed|invalid.*token|unauthorized|login.*failed",
            High,
            Authentication,
        ),
        (
            "API Rate Limiting",
            r"rate.*limit|too.*many.*requests|quota.*exceeded",
            Medium,
            Network,
        ),
        (
            "Memory Issues",
            r"out.*of.*memory|memory.*allocation|heap.*space",
            High,
            System,
        ),
        (
            "Validation Errors",
            r"validation.*failed|invalid.*input|parse.*error",
            Low,
            Business,
        ),
        (
            "Timeout Errors",
            r"timeout|timed.*out|connection.*refused",
            Medium,
            Network,
        ),
    ]
    .into_iter()
    .map(|(name, pattern, severity, category)| {
        Detector::new(name, pattern, severity, category).expect("Invalid built-in pattern")
    })
    .collect()
});

/// The built-in detector catalog, in catalog order
pub fn builtin_detectors() -> &'static [Detector] {
    &BUILTIN_DETECTORS
}

impl fmt::Display for PatternSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatternSeverity::High => "high",
            PatternSeverity::Medium => "medium",
            PatternSeverity::Low => "low",
        };
        f.write_str(label)
    }
}
