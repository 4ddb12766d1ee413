//! Include/exclude classification rules, loaded once from TOML.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::PrimitiveKind;
use crate::{BenchError, BenchResult};

use super::baseline::ECDSA_FAMILY;

/// Rule table compiled into the binary.
pub const DEFAULT_RULES_TOML: &str = include_str!("../../mechanisms.toml");

/// Substring predicate that assigns provider names to one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechanismRule {
    pub family: String,
    pub kind: PrimitiveKind,
    /// Lowercased; all must be present
    pub include: Vec<String>,
    /// Lowercased; any present rejects the name
    pub exclude: Vec<String>,
}

impl MechanismRule {
    pub fn new(
        family: impl Into<String>,
        kind: PrimitiveKind,
        include: &[&str],
        exclude: &[&str],
    ) -> Self {
        MechanismRule {
            family: family.into(),
            kind,
            include: include.iter().map(|s| s.to_lowercase()).collect(),
            exclude: exclude.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Conjunctive include, disjunctive exclude, case-insensitive.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.include.iter().all(|s| name.contains(s.as_str()))
            && !self.exclude.iter().any(|s| name.contains(s.as_str()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default)]
    kem: BTreeMap<String, RawRule>,
    #[serde(default)]
    sig: BTreeMap<String, RawRule>,
}

/// Immutable family → rule table.
#[derive(Debug, Clone)]
pub struct MechanismRules {
    rules: BTreeMap<String, MechanismRule>,
    fingerprint: String,
}

impl MechanismRules {
    /// The table shipped in `mechanisms.toml`.
    pub fn builtin() -> BenchResult<Self> {
        Self::from_toml_str(DEFAULT_RULES_TOML)
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Message(format!("failed to read rules {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> BenchResult<Self> {
        let file: RuleFile = toml::from_str(s)
            .map_err(|e| BenchError::Message(format!("invalid rules file: {e}")))?;
        let mut rules = Vec::new();
        for (kind, table) in [(PrimitiveKind::Kem, file.kem), (PrimitiveKind::Sig, file.sig)] {
            for (family, raw) in table {
                let include: Vec<&str> = raw.include.iter().map(String::as_str).collect();
                let exclude: Vec<&str> = raw.exclude.iter().map(String::as_str).collect();
                rules.push(MechanismRule::new(family, kind, &include, &exclude));
            }
        }
        let mut table = Self::from_rules(rules)?;
        table.fingerprint = crate::sha256_hex(s.as_bytes());
        Ok(table)
    }

    pub fn from_rules(rules: impl IntoIterator<Item = MechanismRule>) -> BenchResult<Self> {
        let mut map = BTreeMap::new();
        for rule in rules {
            if rule.family == ECDSA_FAMILY {
                return Err(BenchError::Message(format!(
                    "family `{ECDSA_FAMILY}` is reserved for the elliptic-curve baseline"
                )));
            }
            if rule.include.iter().all(|s| s.is_empty()) {
                return Err(BenchError::Message(format!(
                    "rule `{}` needs at least one include substring",
                    rule.family
                )));
            }
            if let Some(prev) = map.insert(rule.family.clone(), rule) {
                return Err(BenchError::Message(format!(
                    "duplicate family `{}`",
                    prev.family
                )));
            }
        }
        let fingerprint = crate::sha256_hex(format!("{map:?}").as_bytes());
        Ok(MechanismRules {
            rules: map,
            fingerprint,
        })
    }

    pub fn get(&self, family: &str) -> Option<&MechanismRule> {
        self.rules.get(family)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MechanismRule> {
        self.rules.values()
    }

    pub fn families(&self, kind: PrimitiveKind) -> Vec<&str> {
        self.rules
            .values()
            .filter(|r| r.kind == kind)
            .map(|r| r.family.as_str())
            .collect()
    }

    /// Families of `kind` whose predicate accepts `name`.
    pub fn classify(&self, kind: PrimitiveKind, name: &str) -> Vec<&str> {
        self.rules
            .values()
            .filter(|r| r.kind == kind && r.matches(name))
            .map(|r| r.family.as_str())
            .collect()
    }

    /// SHA-256 of the source the table was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
