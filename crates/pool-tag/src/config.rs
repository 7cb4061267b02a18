//! Routing-tag types and the configured valid sets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Distro alias meaning "every configured distribution".
pub const ANY_DISTRO: &str = "any";

/// A (distro, component) routing tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingTag {
    /// Target distribution, or `any`.
    pub distro: String,

    /// Pool component (e.g. `main`, `hatlabs`).
    pub component: String,
}

impl RoutingTag {
    pub fn new(distro: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            distro: distro.into(),
            component: component.into(),
        }
    }

    /// True when the distro is the `any` alias.
    pub fn is_any(&self) -> bool {
        self.distro == ANY_DISTRO
    }
}

impl fmt::Display for RoutingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}+{}", self.distro, self.component)
    }
}

/// Errors in a configured tag set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagSetError {
    #[error("no distributions configured")]
    NoDistributions,

    #[error("no components configured")]
    NoComponents,

    #[error("'{0}' is reserved and cannot be listed as a distribution")]
    ReservedDistro(String),

    #[error("duplicate {kind} '{value}'")]
    Duplicate { kind: &'static str, value: String },

    #[error("malformed {kind} '{value}': expected lowercase letters only")]
    Malformed { kind: &'static str, value: String },
}

/// Closed sets of recognized distributions and components, plus the
/// fallback tag applied to filenames without a routing suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSets {
    /// Concrete distributions, in routing order.
    pub distributions: Vec<String>,

    /// Recognized components.
    pub components: Vec<String>,

    /// Tag assumed when a filename carries no routing suffix.
    pub default_tag: RoutingTag,
}

impl TagSets {
    /// Check that the sets are usable for routing.
    pub fn check(&self) -> Result<(), TagSetError> {
        if self.distributions.is_empty() {
            return Err(TagSetError::NoDistributions);
        }
        if self.components.is_empty() {
            return Err(TagSetError::NoComponents);
        }

        check_names("distribution", &self.distributions)?;
        check_names("component", &self.components)?;

        if let Some(d) = self.distributions.iter().find(|d| *d == ANY_DISTRO) {
            return Err(TagSetError::ReservedDistro(d.clone()));
        }

        if !is_well_formed_token(&self.default_tag.distro) {
            return Err(TagSetError::Malformed {
                kind: "default distro",
                value: self.default_tag.distro.clone(),
            });
        }
        if !is_well_formed_token(&self.default_tag.component) {
            return Err(TagSetError::Malformed {
                kind: "default component",
                value: self.default_tag.component.clone(),
            });
        }

        Ok(())
    }
}

fn check_names(kind: &'static str, names: &[String]) -> Result<(), TagSetError> {
    let mut seen = HashSet::new();
    for name in names {
        if !is_well_formed_token(name) {
            return Err(TagSetError::Malformed {
                kind,
                value: name.clone(),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(TagSetError::Duplicate {
                kind,
                value: name.clone(),
            });
        }
    }
    Ok(())
}

/// A routing-tag token: non-empty, lowercase ASCII letters only.
pub fn is_well_formed_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets() -> TagSets {
        TagSets {
            distributions: vec!["bookworm".to_string(), "trixie".to_string()],
            components: vec!["main".to_string(), "hatlabs".to_string()],
            default_tag: RoutingTag::new("any", "main"),
        }
    }

    #[test]
    fn test_valid_sets() {
        assert!(sets().check().is_ok());
    }

    #[test]
    fn test_any_is_reserved() {
        let mut s = sets();
        s.distributions.push("any".to_string());
        assert_eq!(s.check(), Err(TagSetError::ReservedDistro("any".to_string())));
    }

    #[test]
    fn test_duplicate_distribution() {
        let mut s = sets();
        s.distributions.push("trixie".to_string());
        assert!(matches!(s.check(), Err(TagSetError::Duplicate { .. })));
    }

    #[test]
    fn test_malformed_component() {
        let mut s = sets();
        s.components.push("Main".to_string());
        assert!(matches!(s.check(), Err(TagSetError::Malformed { .. })));
    }

    #[test]
    fn test_empty_distributions() {
        let mut s = sets();
        s.distributions.clear();
        assert_eq!(s.check(), Err(TagSetError::NoDistributions));
    }

    #[test]
    fn test_token_shape() {
        assert!(is_well_formed_token("trixie"));
        assert!(!is_well_formed_token(""));
        assert!(!is_well_formed_token("trixie2"));
        assert!(!is_well_formed_token("Trixie"));
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(RoutingTag::new("any", "hatlabs").to_string(), "+any+hatlabs");
    }
}
