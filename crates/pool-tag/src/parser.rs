//! Routing-tag suffix parser.
//!
//! Recognizes `+<distro>+<component>` immediately before the file
//! extension, e.g. `signalk_2.17.2-1_all+trixie+main.deb`. Filenames
//! without the suffix are normal (packages built before the convention)
//! and fall back to the configured default tag.

use regex_lite::Regex;
use std::sync::OnceLock;

use crate::config::RoutingTag;

/// `+token+token` followed by a single extension at end of name.
const SUFFIX_PATTERN: &str = r"\+([a-z]+)\+([a-z]+)(\.[A-Za-z0-9]+)$";

fn suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SUFFIX_PATTERN).expect("suffix pattern compiles"))
}

/// Outcome of parsing a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixMatch {
    /// Extracted tag, or the default when nothing matched.
    pub tag: RoutingTag,

    /// Whether the filename carried a routing suffix.
    pub matched: bool,
}

/// Extract the routing tag from a filename.
///
/// Only the final path segment is inspected. Tokens are returned verbatim
/// with no check against the configured sets; see [`crate::validate`].
pub fn parse_suffix(filename: &str, default_tag: &RoutingTag) -> SuffixMatch {
    match suffix_regex().captures(file_name(filename)) {
        Some(caps) => SuffixMatch {
            tag: RoutingTag::new(&caps[1], &caps[2]),
            matched: true,
        },
        None => SuffixMatch {
            tag: default_tag.clone(),
            matched: false,
        },
    }
}

/// Remove the routing suffix from a filename, keeping its extension.
///
/// Names without a suffix are returned unchanged. Directory components
/// are dropped.
pub fn strip_suffix(filename: &str) -> String {
    let name = file_name(filename);
    match suffix_regex().captures(name) {
        Some(caps) => {
            let whole = caps.get(0).map_or(name.len(), |m| m.start());
            format!("{}{}", &name[..whole], &caps[3])
        }
        None => name.to_string(),
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
