//! CLI command handlers for `list` and `rules`.

use std::io::Write;
use std::path::PathBuf;

use crate::catalog::{ECDSA_CURVES, ECDSA_FAMILY, MechanismCatalog, MechanismRules};
use crate::core::PrimitiveKind;
use crate::provider::{BuiltinProvider, PrimitiveProvider};
use crate::run_cmd::load_rules;
use crate::{BenchError, BenchResult};

/// Print each enabled mechanism with its claimed level and family.
pub fn list(kind: Option<PrimitiveKind>, rules: Option<PathBuf>) -> BenchResult<()> {
    let catalog = MechanismCatalog::new(load_rules(rules.as_ref())?);
    let provider = BuiltinProvider::new();
    let stdout = std::io::stdout();
    write_listing(&mut stdout.lock(), &catalog, &provider, kind)
}

pub fn write_listing<W: Write>(
    out: &mut W,
    catalog: &MechanismCatalog,
    provider: &dyn PrimitiveProvider,
    kind: Option<PrimitiveKind>,
) -> BenchResult<()> {
    let kinds: Vec<PrimitiveKind> = match kind {
        Some(k) => vec![k],
        None => vec![PrimitiveKind::Kem, PrimitiveKind::Sig, PrimitiveKind::Ecdsa],
    };
    let io = |e: std::io::Error| BenchError::Message(format!("failed to write listing: {e}"));

    for kind in kinds {
        for name in provider.enabled_mechanisms(kind) {
            let level = provider
                .details(kind, &name)
                .ok()
                .and_then(|d| d.claimed_nist_level)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            let family = catalog.family_of(kind, &name).unwrap_or("-");
            writeln!(out, "{:<6} {:<32} {:>5}  {}", kind.as_str(), name, level, family).map_err(io)?;
        }
    }
    Ok(())
}

/// Print the loaded rule table and its fingerprint.
pub fn rules(path: Option<PathBuf>) -> BenchResult<()> {
    let rules = load_rules(path.as_ref())?;
    let stdout = std::io::stdout();
    write_rules(&mut stdout.lock(), &rules)
}

pub fn write_rules<W: Write>(out: &mut W, rules: &MechanismRules) -> BenchResult<()> {
    let io = |e: std::io::Error| BenchError::Message(format!("failed to write rules: {e}"));
    writeln!(out, "# rules sha256 {}", rules.fingerprint()).map_err(io)?;
    for rule in rules.iter() {
        let exclude = if rule.exclude.is_empty() {
            String::new()
        } else {
            format!("  exclude={}", rule.exclude.join(","))
        };
        writeln!(
            out,
            "{:<4} {:<22} include={}{}",
            rule.kind.as_str(),
            rule.family,
            rule.include.join(","),
            exclude
        )
        .map_err(io)?;
    }
    let curves: Vec<String> = ECDSA_CURVES
        .iter()
        .map(|(level, curve)| format!("{curve}@{level}"))
        .collect();
    writeln!(out, "{:<4} {:<22} {}", PrimitiveKind::Ecdsa.as_str(), ECDSA_FAMILY, curves.join(",")).map_err(io)?;
    Ok(())
}
