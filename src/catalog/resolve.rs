//! Family → `{level → variant}` resolution over a list of provider names.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::core::PrimitiveKind;
use crate::{BenchError, BenchResult};

use super::baseline::{ECDSA_FAMILY, resolve_baseline};
use super::rules::{MechanismRule, MechanismRules};

/// One requested family with at most one concrete variant per level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFamily {
    pub family: String,
    pub kind: PrimitiveKind,
    pub variants: BTreeMap<u8, String>,
}

impl ResolvedFamily {
    /// `(level, variant)` in ascending level order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.variants.iter().map(|(l, v)| (*l, v.as_str()))
    }
}

/// Apply one rule to `available`.
///
/// Every matching name must have a level; a name without one is an error even
/// if its level would have been filtered out. A failing lookup is returned
/// as is. On a level collision the name enumerated last replaces earlier ones.
pub fn resolve_family<F>(
    rule: &MechanismRule,
    available: &[String],
    allowed: &BTreeSet<u8>,
    level_of: &mut F,
) -> BenchResult<BTreeMap<u8, String>>
where
    F: FnMut(&str) -> BenchResult<Option<u8>>,
{
    let mut by_level = BTreeMap::new();
    for name in available.iter().filter(|n| rule.matches(n)) {
        let level = level_of(name)?.ok_or_else(|| BenchError::MissingLevel {
            family: rule.family.clone(),
            variant: name.clone(),
        })?;
        if !allowed.contains(&level) {
            debug!(family = %rule.family, variant = %name, level, "level filtered out");
            continue;
        }
        if let Some(prev) = by_level.insert(level, name.clone()) {
            debug!(family = %rule.family, level, replaced = %prev, by = %name, "level collision");
        }
    }
    Ok(by_level)
}

/// Resolve `families` in request order against a single name list.
///
/// The baseline family bypasses `available` and `rules`. Repeated identifiers
/// are resolved once; families with nothing left after filtering are omitted.
pub fn resolve<F>(
    families: &[String],
    available: &[String],
    rules: &MechanismRules,
    allowed: &BTreeSet<u8>,
    mut level_of: F,
) -> BenchResult<Vec<ResolvedFamily>>
where
    F: FnMut(&str) -> Option<u8>,
{
    resolve_by_kind(
        families,
        rules,
        allowed,
        |_| available.to_vec(),
        |_, name| Ok(level_of(name)),
    )
}

/// Like [`resolve`], but each rule is matched against the names enumerated
/// for its own primitive kind. `names_for` is called at most once per kind;
/// an error from `level_of` aborts resolution.
pub(crate) fn resolve_by_kind<N, F>(
    families: &[String],
    rules: &MechanismRules,
    allowed: &BTreeSet<u8>,
    mut names_for: N,
    mut level_of: F,
) -> BenchResult<Vec<ResolvedFamily>>
where
    N: FnMut(PrimitiveKind) -> Vec<String>,
    F: FnMut(PrimitiveKind, &str) -> BenchResult<Option<u8>>,
{
    let mut seen = BTreeSet::new();
    let mut enumerated: BTreeMap<PrimitiveKind, Vec<String>> = BTreeMap::new();
    let mut out = Vec::new();
    for family in families {
        if !seen.insert(family.as_str()) {
            continue;
        }
        let (kind, variants) = if family == ECDSA_FAMILY {
            (PrimitiveKind::Ecdsa, resolve_baseline(allowed))
        } else {
            let rule = rules.get(family).ok_or_else(|| BenchError::UnknownFamily {
                family: family.clone(),
            })?;
            let available = enumerated
                .entry(rule.kind)
                .or_insert_with(|| names_for(rule.kind));
            let mut level = |name: &str| level_of(rule.kind, name);
            (rule.kind, resolve_family(rule, available.as_slice(), allowed, &mut level)?)
        };
        if variants.is_empty() {
            debug!(family = %family, "no variants at requested levels");
            continue;
        }
        out.push(ResolvedFamily {
            family: family.clone(),
            kind,
            variants,
        });
    }
    Ok(out)
}
