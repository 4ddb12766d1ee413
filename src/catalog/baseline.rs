//! Classical elliptic-curve baseline, resolved from a fixed table.

use std::collections::{BTreeMap, BTreeSet};

/// Family identifier of the baseline; never matched against provider names.
pub const ECDSA_FAMILY: &str = "ecdsa";

/// `(claimed level, curve identifier)`.
pub const ECDSA_CURVES: &[(u8, &str)] = &[(1, "P-256"), (3, "P-384"), (5, "P-521")];

/// Curves whose level passes `allowed`.
pub fn resolve_baseline(allowed: &BTreeSet<u8>) -> BTreeMap<u8, String> {
    ECDSA_CURVES
        .iter()
        .filter(|(level, _)| allowed.contains(level))
        .map(|(level, curve)| (*level, (*curve).to_string()))
        .collect()
}

pub fn curve_level(curve: &str) -> Option<u8> {
    ECDSA_CURVES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(curve))
        .map(|(level, _)| *level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_filtered_by_level() {
        let allowed: BTreeSet<u8> = [2, 3, 5].into_iter().collect();
        let curves = resolve_baseline(&allowed);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[&3], "P-384");
        assert_eq!(curves[&5], "P-521");

        let allowed: BTreeSet<u8> = [2, 4].into_iter().collect();
        assert!(resolve_baseline(&allowed).is_empty());
    }

    #[test]
    fn test_curve_level() {
        assert_eq!(curve_level("p-256"), Some(1));
        assert_eq!(curve_level("P-521"), Some(5));
        assert_eq!(curve_level("secp256k1"), None);
    }
}
