//! Routing-tag parsing and validation for APT pool artifacts.
//!
//! Release assets carry an optional `+<distro>+<component>` suffix right
//! before the file extension. This crate extracts that tag from a filename
//! and checks it against the configured distribution and component sets.

mod config;
mod parser;
mod result;

pub use config::{is_well_formed_token, RoutingTag, TagSetError, TagSets, ANY_DISTRO};
pub use parser::{parse_suffix, strip_suffix, SuffixMatch};
pub use result::{Validation, ValidationWarning};

/// Validate a routing tag against the configured sets.
///
/// Unrecognized values are reported, never corrected. `any` is always an
/// accepted distro. The result is advisory: callers decide whether a
/// warning blocks routing.
pub fn validate(tag: &RoutingTag, sets: &TagSets) -> Validation {
    let mut warnings = Vec::new();

    if !tag.is_any() && !sets.distributions.iter().any(|d| *d == tag.distro) {
        warnings.push(ValidationWarning::UnknownDistro {
            value: tag.distro.clone(),
            known: sets.distributions.clone(),
        });
    }

    if !sets.components.iter().any(|c| *c == tag.component) {
        warnings.push(ValidationWarning::UnknownComponent {
            value: tag.component.clone(),
            known: sets.components.clone(),
        });
    }

    Validation::from_warnings(warnings)
}
