//! Mechanism resolution: family identifiers to concrete variants by level.

pub mod baseline;
pub mod resolve;
pub mod rules;

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::core::{PrimitiveKind, SECURITY_LEVELS};
use crate::provider::PrimitiveProvider;
use crate::{BenchError, BenchResult};

pub use baseline::{ECDSA_CURVES, ECDSA_FAMILY};
pub use resolve::{ResolvedFamily, resolve, resolve_family};
pub use rules::{DEFAULT_RULES_TOML, MechanismRule, MechanismRules};

/// Resolves requested families against a provider using a fixed rule table.
#[derive(Debug, Clone)]
pub struct MechanismCatalog {
    rules: MechanismRules,
}

impl MechanismCatalog {
    pub fn new(rules: MechanismRules) -> Self {
        MechanismCatalog { rules }
    }

    pub fn rules(&self) -> &MechanismRules {
        &self.rules
    }

    /// Validate a level filter: non-empty and within 1..=5.
    pub fn level_filter(levels: &[u8]) -> BenchResult<BTreeSet<u8>> {
        if levels.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one security level is required".into(),
            ));
        }
        if let Some(bad) = levels.iter().find(|l| !SECURITY_LEVELS.contains(*l)) {
            return Err(BenchError::InvalidConfig(format!(
                "security level {bad} is outside 1..=5"
            )));
        }
        Ok(levels.iter().copied().collect())
    }

    /// Resolve `families` in request order.
    ///
    /// KEM rules are matched against the provider's KEM enumeration and
    /// signature rules against its signature enumeration; the claimed level
    /// comes from the provider's metadata.
    pub fn resolve_all(
        &self,
        families: &[String],
        provider: &dyn PrimitiveProvider,
        levels: &[u8],
    ) -> BenchResult<Vec<ResolvedFamily>> {
        let allowed = Self::level_filter(levels)?;
        let resolved = resolve::resolve_by_kind(
            families,
            &self.rules,
            &allowed,
            |kind| {
                let names = provider.enabled_mechanisms(kind);
                debug!(kind = %kind, count = names.len(), "enumerated provider mechanisms");
                names
            },
            |kind, name| {
                provider
                    .details(kind, name)
                    .map(|d| d.claimed_nist_level)
            },
        )?;
        info!(
            requested = families.len(),
            resolved = resolved.len(),
            variants = resolved.iter().map(|f| f.variants.len()).sum::<usize>(),
            "resolved mechanism families"
        );
        Ok(resolved)
    }

    /// Family a provider name classifies into, if exactly one rule accepts it.
    pub fn family_of(&self, kind: PrimitiveKind, name: &str) -> Option<&str> {
        if kind == PrimitiveKind::Ecdsa {
            return baseline::curve_level(name).map(|_| ECDSA_FAMILY);
        }
        match self.rules.classify(kind, name).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BuiltinProvider, MockConfig, MockProvider};

    fn fams(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_level_filter_validation() {
        assert!(MechanismCatalog::level_filter(&[]).is_err());
        assert!(MechanismCatalog::level_filter(&[0]).is_err());
        assert!(MechanismCatalog::level_filter(&[6]).is_err());
        assert_eq!(MechanismCatalog::level_filter(&[5, 1, 5]).unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_all_uses_kind_specific_lists() {
        // a KEM rule must not pick up a signature name that happens to match
        let rules = MechanismRules::from_rules([
            MechanismRule::new("kyber", PrimitiveKind::Kem, &["kyber"], &[]),
            MechanismRule::new("falcon", PrimitiveKind::Sig, &["falcon"], &[]),
        ])
        .unwrap();
        let mock = MockProvider::new(
            MockConfig::new("m")
                .with_kem("Kyber512", 1)
                .with_sig("Kyber-lookalike-sig", 1)
                .with_sig("Falcon-512", 1),
        );
        let catalog = MechanismCatalog::new(rules);
        let out = catalog
            .resolve_all(&fams(&["kyber", "falcon"]), &mock, &[1, 2, 3, 4, 5])
            .unwrap();
        assert_eq!(out[0].variants[&1], "Kyber512");
        assert_eq!(out[1].variants[&1], "Falcon-512");
    }

    #[test]
    fn test_resolve_all_missing_level() {
        let rules =
            MechanismRules::from_rules([MechanismRule::new("k", PrimitiveKind::Kem, &["k"], &[])])
                .unwrap();
        let mock = MockProvider::new(MockConfig::new("m").with_kem("K1", 1).without_level("K1"));
        let err = MechanismCatalog::new(rules)
            .resolve_all(&fams(&["k"]), &mock, &[1])
            .unwrap_err();
        assert!(matches!(err, BenchError::MissingLevel { .. }));
    }

    #[test]
    fn test_resolve_all_propagates_details_error() {
        let rules = MechanismRules::from_rules([MechanismRule::new(
            "kyber",
            PrimitiveKind::Kem,
            &["kyber"],
            &[],
        )])
        .unwrap();
        let mock = MockProvider::new(
            MockConfig::new("m")
                .with_kem("Kyber512", 1)
                .details_fails("Kyber512"),
        );
        let err = MechanismCatalog::new(rules)
            .resolve_all(&fams(&["kyber"]), &mock, &[1])
            .unwrap_err();
        assert!(matches!(err, BenchError::ProviderUnavailable { variant } if variant == "Kyber512"));
    }

    #[test]
    fn test_resolve_all_against_builtin() {
        let catalog = MechanismCatalog::new(MechanismRules::builtin().unwrap());
        let provider = BuiltinProvider::new();
        let out = catalog
            .resolve_all(
                &fams(&["mlkem", "mldsa", "slh-dsa-shake-f", "ecdsa"]),
                &provider,
                &[1, 3],
            )
            .unwrap();
        let order: Vec<&str> = out.iter().map(|f| f.family.as_str()).collect();
        assert_eq!(order, vec!["mlkem", "mldsa", "slh-dsa-shake-f", "ecdsa"]);
        assert_eq!(out[0].variants[&1], "ML-KEM-512");
        assert_eq!(out[0].variants[&3], "ML-KEM-768");
        // ML-DSA-44 claims level 2 and is filtered out
        assert_eq!(out[1].variants.keys().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(out[2].variants[&1], "SLH-DSA-SHAKE-128f");
        assert_eq!(out[3].variants[&3], "P-384");
    }

    #[test]
    fn test_family_of() {
        let catalog = MechanismCatalog::new(MechanismRules::builtin().unwrap());
        assert_eq!(catalog.family_of(PrimitiveKind::Kem, "ML-KEM-768"), Some("mlkem"));
        assert_eq!(catalog.family_of(PrimitiveKind::Ecdsa, "P-256"), Some("ecdsa"));
        assert_eq!(catalog.family_of(PrimitiveKind::Kem, "X25519"), None);
    }
}
