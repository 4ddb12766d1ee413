//! Benchmark environment stamped onto persisted run records.
//!
//! Timings of lattice and hash-based primitives move with the build profile,
//! the SIMD/crypto extensions the CPU exposes and the version of the crate
//! doing the arithmetic, so all three are recorded next to the host summary.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Primitive crates linked by the built-in provider, with the version
/// requirement they are built against.
pub const PRIMITIVE_CRATES: &[(&str, &str)] = &[
    ("fips203", "0.4"),
    ("fips204", "0.4"),
    ("fips205", "0.4"),
    ("p256", "0.13"),
    ("p384", "0.13"),
    ("p521", "0.13"),
];

/// How this binary was compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProfile {
    /// `debug` or `release`; debug timings are not comparable
    pub profile: String,
    pub target_arch: String,
    pub target_os: String,
    /// Target features enabled at compile time (e.g. via `-C target-cpu`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_features: Vec<String>,
}

impl BuildProfile {
    pub fn current() -> Self {
        BuildProfile {
            profile: if cfg!(debug_assertions) { "debug" } else { "release" }.to_string(),
            target_arch: std::env::consts::ARCH.to_string(),
            target_os: std::env::consts::OS.to_string(),
            static_features: compiled_features(),
        }
    }

    pub fn is_release(&self) -> bool {
        self.profile == "release"
    }
}

/// Machine the measurements were taken on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
}

/// Environment information for benchmark reproducibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub build: BuildProfile,
    pub host: HostSummary,
    /// Timing-relevant CPU extensions available at run time
    #[serde(default)]
    pub cpu_features: Vec<String>,
    /// `(crate, version requirement)` for every linked primitive crate
    #[serde(default)]
    pub primitive_crates: Vec<(String, String)>,
}

/// Build and crate information only; host fields stay empty.
impl Default for EnvironmentInfo {
    fn default() -> Self {
        EnvironmentInfo {
            build: BuildProfile::current(),
            host: HostSummary::default(),
            cpu_features: Vec::new(),
            primitive_crates: PRIMITIVE_CRATES
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
        }
    }
}

impl EnvironmentInfo {
    /// Full environment of the current host.
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let host = HostSummary {
            cpu_model: sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|s| !s.is_empty()),
            cpu_cores: sys.physical_core_count().map(|c| c as u32),
            total_ram_bytes: Some(sys.total_memory()).filter(|b| *b > 0),
            os_version: System::long_os_version(),
        };
        let cpu_features = runtime_features();
        if !BuildProfile::current().is_release() {
            warn!("debug build: timings are not representative");
        }
        debug!(features = ?cpu_features, "detected cpu features");

        EnvironmentInfo {
            host,
            cpu_features,
            ..Default::default()
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.cpu_features.iter().any(|f| f == feature)
    }
}

#[cfg(target_arch = "x86_64")]
fn runtime_features() -> Vec<String> {
    let mut out = Vec::new();
    macro_rules! check {
        ($($f:tt),*) => {
            $(if std::arch::is_x86_feature_detected!($f) {
                out.push($f.to_string());
            })*
        };
    }
    check!("aes", "pclmulqdq", "sha", "avx2", "bmi2", "adx", "avx512f");
    out
}

#[cfg(target_arch = "aarch64")]
fn runtime_features() -> Vec<String> {
    let mut out = Vec::new();
    macro_rules! check {
        ($($f:tt),*) => {
            $(if std::arch::is_aarch64_feature_detected!($f) {
                out.push($f.to_string());
            })*
        };
    }
    check!("neon", "aes", "sha2", "sha3");
    out
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn runtime_features() -> Vec<String> {
    Vec::new()
}

fn compiled_features() -> Vec<String> {
    let flags = [
        ("aes", cfg!(target_feature = "aes")),
        ("sha", cfg!(target_feature = "sha")),
        ("avx2", cfg!(target_feature = "avx2")),
        ("bmi2", cfg!(target_feature = "bmi2")),
        ("neon", cfg!(target_feature = "neon")),
    ];
    flags
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lists_primitive_crates() {
        let env = EnvironmentInfo::default();
        assert_eq!(env.build.profile == "debug", cfg!(debug_assertions));
        assert!(env.host.cpu_model.is_none());
        let names: Vec<&str> = env.primitive_crates.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["fips203", "fips204", "fips205", "p256", "p384", "p521"]);
    }

    #[test]
    fn test_detect_fills_host_and_keeps_build() {
        let env = EnvironmentInfo::detect();
        assert_eq!(env.build, BuildProfile::current());
        assert!(!env.build.target_arch.is_empty());
        assert_eq!(env.primitive_crates.len(), PRIMITIVE_CRATES.len());
        // compile-time features are always available at run time
        if cfg!(any(target_arch = "x86_64", target_arch = "aarch64")) {
            for f in &env.build.static_features {
                assert!(env.has_feature(f), "{f} compiled in but not detected");
            }
        }
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(EnvironmentInfo::default()).unwrap();
        assert!(value["build"]["profile"].is_string());
        assert!(value["host"].as_object().unwrap().is_empty());
        assert_eq!(value["primitive_crates"][0][0], "fips203");
        let back: EnvironmentInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back, EnvironmentInfo::default());
    }
}
