//! Header/parameter precedence merging.

use std::collections::HashMap;

/// Merge process-wide defaults with per-request overrides.
///
/// Returns the union of both maps; for keys present in both, the override
/// value wins. Neither input is mutated.
pub fn merge(
    defaults: &HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut effective = defaults.clone();
    effective.extend(
        overrides
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_override_wins_on_shared_key() {
        let defaults = map(&[("token", "default"), ("lang", "en")]);
        let overrides = map(&[("token", "per-request")]);

        let effective = merge(&defaults, &overrides);
        assert_eq!(effective["token"], "per-request");
        assert_eq!(effective["lang"], "en");
        assert_eq!(effective.len(), 2);
    }

    #[test]
    fn test_empty_overrides_keeps_defaults() {
        let defaults = map(&[("a", "1"), ("b", "2")]);
        let effective = merge(&defaults, &HashMap::new());
        assert_eq!(effective, defaults);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let defaults = map(&[("a", "1")]);
        let overrides = map(&[("a", "2")]);
        let _ = merge(&defaults, &overrides);
        assert_eq!(defaults["a"], "1");
        assert_eq!(overrides["a"], "2");
    }

    proptest! {
        #[test]
        fn disjoint_keys_merge_to_union(
            defaults in prop::collection::hash_map("[a-m]{1,6}", "\\PC{0,6}", 0..8),
            overrides in prop::collection::hash_map("[n-z]{1,6}", "\\PC{0,6}", 0..8),
        ) {
            let effective = merge(&defaults, &overrides);
            prop_assert_eq!(effective.len(), defaults.len() + overrides.len());
            for (k, v) in defaults.iter().chain(overrides.iter()) {
                prop_assert_eq!(&effective[k], v);
            }
        }

        #[test]
        fn shared_key_takes_override_value(
            key in "[a-z]{1,6}",
            default_value in "\\PC{0,6}",
            override_value in "\\PC{0,6}",
        ) {
            let mut defaults = HashMap::new();
            defaults.insert(key.clone(), default_value);
            let mut overrides = HashMap::new();
            overrides.insert(key.clone(), override_value.clone());

            let effective = merge(&defaults, &overrides);
            prop_assert_eq!(&effective[&key], &override_value);
        }

        #[test]
        fn every_unoverridden_default_survives(
            defaults in prop::collection::hash_map("[a-z]{1,6}", "\\PC{0,6}", 0..8),
            overrides in prop::collection::hash_map("[a-z]{1,6}", "\\PC{0,6}", 0..8),
        ) {
            let effective = merge(&defaults, &overrides);
            for (k, v) in &defaults {
                if !overrides.contains_key(k) {
                    prop_assert_eq!(&effective[k], v);
                }
            }
            for (k, v) in &overrides {
                prop_assert_eq!(&effective[k], v);
            }
        }
    }
}
