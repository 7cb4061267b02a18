//! Distribution alias expansion

use pool_tag::ANY_DISTRO;

/// Resolve a parsed distro into the concrete distributions to route to.
///
/// `any` yields the configured set in configuration order. Any other value
/// yields exactly itself, registered or not, so packages for a new
/// distribution route correctly before the configuration catches up.
pub fn expand_distro(distro: &str, distributions: &[String]) -> Vec<String> {
    if distro == ANY_DISTRO {
        distributions.to_vec()
    } else {
        vec![distro.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dists() -> Vec<String> {
        vec!["bookworm".to_string(), "trixie".to_string()]
    }

    #[test]
    fn test_any_expands_in_config_order() {
        assert_eq!(expand_distro("any", &dists()), vec!["bookworm", "trixie"]);

        let reversed = vec!["trixie".to_string(), "bookworm".to_string()];
        assert_eq!(expand_distro("any", &reversed), vec!["trixie", "bookworm"]);
    }

    #[test]
    fn test_any_is_stable_across_calls() {
        let first = expand_distro("any", &dists());
        for _ in 0..10 {
            assert_eq!(expand_distro("any", &dists()), first);
        }
    }

    #[test]
    fn test_concrete_distro_is_singleton() {
        assert_eq!(expand_distro("trixie", &dists()), vec!["trixie"]);
    }

    #[test]
    fn test_unregistered_distro_still_routes() {
        assert_eq!(expand_distro("forky", &dists()), vec!["forky"]);
    }

    #[test]
    fn test_any_against_empty_set() {
        assert!(expand_distro("any", &[]).is_empty());
    }
}
