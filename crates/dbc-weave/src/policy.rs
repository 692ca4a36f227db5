//! Enforcement policy engine.
//!
//! Pure resolution of an [`EnforcementConfig`] plus a directory into the
//! [`ResolvedPolicy`] for structures loaded from that directory. No I/O: the
//! directory is matched as a path, never inspected on disk.

use std::path::Path;

use dbc_core::{DirectoryRule, EnforcementConfig, EnforcementLevel, ResolvedPolicy};

/// Resolves the policy for structures loaded from `directory`.
///
/// The directory rule with the longest matching path prefix decides whether
/// the directory is enforced; matching is by whole path components, so a
/// rule for `src/app` does not cover `src/application`. Among equally long
/// matches the last declared rule wins. No matching rule means enforced.
pub fn resolve_policy(config: &EnforcementConfig, directory: &Path) -> ResolvedPolicy {
    let enforced = matching_rule(&config.directories, directory).map_or(true, |rule| rule.enforced);
    if !enforced {
        return ResolvedPolicy::disabled(config.reaction);
    }
    ResolvedPolicy {
        enforced: true,
        preconditions: config.level.contains(EnforcementLevel::PRECONDITIONS),
        postconditions: config.level.contains(EnforcementLevel::POSTCONDITIONS),
        invariants: config.level.contains(EnforcementLevel::INVARIANTS),
        type_safety: config.type_safety,
        reaction: config.reaction,
    }
}

fn matching_rule<'a>(rules: &'a [DirectoryRule], directory: &Path) -> Option<&'a DirectoryRule> {
    rules
        .iter()
        .filter(|rule| directory.starts_with(&rule.path))
        .max_by_key(|rule| rule.path.components().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbc_core::Reaction;
    use proptest::prelude::*;

    fn config() -> EnforcementConfig {
        EnforcementConfig::default()
    }

    #[test]
    fn defaults_enable_everything() {
        let policy = resolve_policy(&config(), Path::new("src"));
        assert!(policy.enforced);
        assert!(policy.preconditions && policy.postconditions && policy.invariants);
        assert!(policy.type_safety);
        assert_eq!(policy.reaction, Reaction::Raising);
    }

    #[test]
    fn disabled_directory_overrides_level_and_type_safety() {
        let cfg = config().with_directory(DirectoryRule::new("vendor", false));
        let policy = resolve_policy(&cfg, Path::new("vendor/lib/Queue.php"));
        assert_eq!(policy, ResolvedPolicy::disabled(Reaction::Raising));
        assert!(!policy.any_active());
    }

    #[test]
    fn longest_prefix_wins() {
        let cfg = config()
            .with_directory(DirectoryRule::new("vendor/acme", true))
            .with_directory(DirectoryRule::new("vendor", false));
        assert!(resolve_policy(&cfg, Path::new("vendor/acme/src")).enforced);
        assert!(!resolve_policy(&cfg, Path::new("vendor/other")).enforced);
    }

    #[test]
    fn prefix_matching_is_component_wise() {
        let cfg = config().with_directory(DirectoryRule::new("src/app", false));
        assert!(!resolve_policy(&cfg, Path::new("src/app/models")).enforced);
        assert!(resolve_policy(&cfg, Path::new("src/application")).enforced);
    }

    #[test]
    fn later_rule_wins_on_equal_length() {
        let cfg = config()
            .with_directory(DirectoryRule::new("lib", false))
            .with_directory(DirectoryRule::new("lib", true));
        assert!(resolve_policy(&cfg, Path::new("lib")).enforced);
    }

    #[test]
    fn preconditions_only_level() {
        let cfg = config().with_level(EnforcementLevel::PRECONDITIONS);
        let policy = resolve_policy(&cfg, Path::new("src"));
        assert!(policy.preconditions);
        assert!(!policy.postconditions);
        assert!(!policy.invariants);
    }

    proptest! {
        #[test]
        fn level_bits_map_to_flags(bits in 0u8..=7, type_safety in any::<bool>()) {
            let cfg = config()
                .with_level(EnforcementLevel::from_bits(bits).unwrap())
                .with_type_safety(type_safety);
            let policy = resolve_policy(&cfg, Path::new("src"));
            prop_assert_eq!(policy.preconditions, bits & 1 != 0);
            prop_assert_eq!(policy.postconditions, bits & 2 != 0);
            prop_assert_eq!(policy.invariants, bits & 4 != 0);
            prop_assert_eq!(policy.type_safety, type_safety);
        }
    }
}
