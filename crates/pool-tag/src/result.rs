//! Validation result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field of a routing tag that is not in the configured set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "detail")]
pub enum ValidationWarning {
    /// Distro is neither `any` nor a configured distribution.
    #[serde(rename = "UNKNOWN_DISTRO")]
    UnknownDistro { value: String, known: Vec<String> },

    /// Component is not a configured component.
    #[serde(rename = "UNKNOWN_COMPONENT")]
    UnknownComponent { value: String, known: Vec<String> },
}

impl ValidationWarning {
    /// Machine-readable form, e.g. `UNKNOWN_DISTRO:forky`.
    pub fn to_code(&self) -> String {
        match self {
            ValidationWarning::UnknownDistro { value, .. } => format!("UNKNOWN_DISTRO:{}", value),
            ValidationWarning::UnknownComponent { value, .. } => {
                format!("UNKNOWN_COMPONENT:{}", value)
            }
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::UnknownDistro { value, known } => write!(
                f,
                "unknown distro '{}' (known: any, {})",
                value,
                known.join(", ")
            ),
            ValidationWarning::UnknownComponent { value, known } => write!(
                f,
                "unknown component '{}' (known: {})",
                value,
                known.join(", ")
            ),
        }
    }
}

/// Result of validating a routing tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Validation {
    /// True when every field is recognized.
    pub valid: bool,

    /// One entry per unrecognized field.
    #[serde(default)]
    pub warnings: Vec<ValidationWarning>,
}

impl Validation {
    pub fn from_warnings(warnings: Vec<ValidationWarning>) -> Self {
        Self {
            valid: warnings.is_empty(),
            warnings,
        }
    }

    pub fn warning_codes(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.to_code()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_valid() {
        let v = Validation::from_warnings(Vec::new());
        assert!(v.valid);
    }

    #[test]
    fn test_serialization_tags() {
        let v = Validation::from_warnings(vec![ValidationWarning::UnknownComponent {
            value: "contrib".to_string(),
            known: vec!["main".to_string()],
        }]);
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"valid\":false"));
        assert!(json.contains("\"type\":\"UNKNOWN_COMPONENT\""));
    }

    #[test]
    fn test_display() {
        let w = ValidationWarning::UnknownDistro {
            value: "forky".to_string(),
            known: vec!["bookworm".to_string(), "trixie".to_string()],
        };
        assert_eq!(w.to_string(), "unknown distro 'forky' (known: any, bookworm, trixie)");
    }
}
