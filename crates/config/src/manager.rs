//! The configuration manager: load once, swap atomically on reload.
//!
//! Readers call `snapshot()` and get an `Arc<ConfigSnapshot>` — a cheap
//! pointer clone taken under a read lock that is never held across I/O.
//! `reload()` builds and validates a complete new snapshot before taking
//! the write lock; a failed reload leaves the active snapshot untouched.

use crate::model::ConfigSnapshot;
use crate::overlay::{merge_layers, parse_table};
use crate::ConfigError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// The layered document paths: base, then optional environment and
/// region overlays, applied in that order.
#[derive(Debug, Clone)]
pub struct LayeredPaths {
    pub base: PathBuf,
    pub environment: Option<PathBuf>,
    pub region: Option<PathBuf>,
}

impl LayeredPaths {
    /// Base document only.
    pub fn base_only(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            environment: None,
            region: None,
        }
    }

    /// Conventional layout: `<dir>/base.toml` plus `<dir>/<env>.toml`
    /// and `<dir>/<region>.toml` when named.
    pub fn from_dir(dir: &Path, environment: Option<&str>, region: Option<&str>) -> Self {
        Self {
            base: dir.join("base.toml"),
            environment: environment.map(|e| dir.join(format!("{e}.toml"))),
            region: region.map(|r| dir.join(format!("{r}.toml"))),
        }
    }
}

/// Holds the active configuration snapshot.
pub struct ConfigManager {
    current: RwLock<Arc<ConfigSnapshot>>,
    paths: Option<LayeredPaths>,
    next_version: AtomicU64,
}

impl ConfigManager {
    /// A manager with compiled-in defaults and no backing documents.
    /// `use_config_driven_thresholds` is off: legacy mode.
    pub fn with_defaults() -> Self {
        Self {
            current: RwLock::new(Arc::new(ConfigSnapshot::default())),
            paths: None,
            next_version: AtomicU64::new(1),
        }
    }

    /// A manager seeded with a specific snapshot (used by tests and
    /// embedders that load configuration themselves).
    pub fn with_snapshot(snapshot: ConfigSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            paths: None,
            next_version: AtomicU64::new(2),
        }
    }

    /// Load the layered documents at startup.
    ///
    /// A load failure is a `ConfigurationError`, not a crash: the manager
    /// starts on compiled-in defaults (legacy mode) and logs the reason.
    pub fn load(paths: LayeredPaths) -> Self {
        match build_snapshot(&paths) {
            Ok(mut snapshot) => {
                snapshot.version = 1;
                info!(
                    environment = %snapshot.environment,
                    region = %snapshot.region,
                    version = snapshot.version,
                    "Configuration loaded"
                );
                Self {
                    current: RwLock::new(Arc::new(snapshot)),
                    paths: Some(paths),
                    next_version: AtomicU64::new(2),
                }
            }
            Err(e) => {
                warn!(error = %e, "Configuration load failed; starting with compiled-in defaults");
                Self {
                    current: RwLock::new(Arc::new(ConfigSnapshot::default())),
                    paths: Some(paths),
                    next_version: AtomicU64::new(1),
                }
            }
        }
    }

    /// Load strictly, propagating the error instead of falling back.
    /// Used by `config validate` style tooling.
    pub fn try_load(paths: LayeredPaths) -> Result<Self, ConfigError> {
        let mut snapshot = build_snapshot(&paths)?;
        snapshot.version = 1;
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            paths: Some(paths),
            next_version: AtomicU64::new(2),
        })
    }

    /// The active snapshot. Lock-free for the caller's lifetime: the
    /// read lock is released before this returns.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.read().unwrap().clone()
    }

    /// Re-read the layered documents and swap in a new snapshot.
    ///
    /// All-or-nothing: any failure keeps the prior snapshot active and
    /// returns the error. On success, returns the new version.
    pub fn reload(&self) -> Result<u64, ConfigError> {
        let Some(paths) = &self.paths else {
            return Err(ConfigError::ValidationError(
                "manager has no backing documents to reload".into(),
            ));
        };

        match build_snapshot(paths) {
            Ok(mut snapshot) => {
                snapshot.version = self.next_version.fetch_add(1, Ordering::SeqCst);
                let version = snapshot.version;
                *self.current.write().unwrap() = Arc::new(snapshot);
                info!(version, "Configuration reloaded");
                Ok(version)
            }
            Err(e) => {
                warn!(error = %e, "Configuration reload rejected; previous snapshot remains active");
                Err(e)
            }
        }
    }
}

/// Read, merge, deserialize, and validate the layered documents.
fn build_snapshot(paths: &LayeredPaths) -> Result<ConfigSnapshot, ConfigError> {
    let mut merged = read_layer(&paths.base)?;

    for overlay_path in [&paths.environment, &paths.region].into_iter().flatten() {
        let overlay = read_layer(overlay_path)?;
        merge_layers(&mut merged, &overlay)?;
    }

    let snapshot: ConfigSnapshot = merged.try_into().map_err(|e: toml::de::Error| {
        ConfigError::ParseError {
            path: paths.base.clone(),
            reason: e.to_string(),
        }
    })?;

    snapshot.validate()?;
    Ok(snapshot)
}

fn read_layer(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_table(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str = r#"
environment = "base"
region = ""

[thresholds]
similarity = 0.88
accuracy = 0.82
fallback_confidence = 0.30

[thresholds.rule_confidence]
R001 = 0.98

[sla]
default_hours = 24

[llm]
model = "gpt-4o-mini"
timeout_secs = 30
max_retries = 1
backoff_ms = 250
top_k = 5

[routing]
default_department = "general_support"
departments = ["billing", "credit_management", "technical_support_l1"]

[feature_flags]
use_config_driven_thresholds = true
"#;

    fn write_layers(dir: &Path, env_body: Option<&str>, region_body: Option<&str>) -> LayeredPaths {
        fs::write(dir.join("base.toml"), BASE).unwrap();
        if let Some(body) = env_body {
            fs::write(dir.join("production.toml"), body).unwrap();
        }
        if let Some(body) = region_body {
            fs::write(dir.join("eu-west.toml"), body).unwrap();
        }
        LayeredPaths::from_dir(
            dir,
            env_body.map(|_| "production"),
            region_body.map(|_| "eu-west"),
        )
    }

    #[test]
    fn base_only_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_layers(dir.path(), None, None);

        let manager = ConfigManager::try_load(paths).unwrap();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.thresholds.similarity, 0.88);
        assert_eq!(snapshot.version, 1);
        assert!(snapshot.config_driven());
    }

    #[test]
    fn environment_then_region_overlay_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_layers(
            dir.path(),
            Some("environment = \"production\"\n[thresholds]\nsimilarity = 0.90\naccuracy = 0.84\n"),
            Some("region = \"eu-west\"\n[thresholds]\nsimilarity = 0.92\n"),
        );

        let snapshot = ConfigManager::try_load(paths).unwrap().snapshot();
        // Region wins over environment for the key both set.
        assert_eq!(snapshot.thresholds.similarity, 0.92);
        // Environment-only key survives the region overlay.
        assert_eq!(snapshot.thresholds.accuracy, 0.84);
        assert_eq!(snapshot.environment, "production");
        assert_eq!(snapshot.region, "eu-west");
    }

    #[test]
    fn out_of_bounds_overlay_rejected_and_prior_kept() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_layers(dir.path(), None, None);
        let manager = ConfigManager::try_load(paths).unwrap();
        let before = manager.snapshot();

        // Rewrite the base document with an out-of-bounds confidence
        // (bound min is 0.5), then ask the manager to reload it.
        fs::write(
            dir.path().join("base.toml"),
            BASE.replace("R001 = 0.98", "R001 = 0.45"),
        )
        .unwrap();

        let err = manager.reload().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfBounds { .. }));

        let after = manager.snapshot();
        assert_eq!(after.version, before.version);
        assert_eq!(after.thresholds.rule_confidence["R001"], 0.98);
    }

    #[test]
    fn unknown_overlay_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_layers(dir.path(), Some("[thresholds]\nsimilariti = 0.9\n"), None);
        assert!(matches!(
            ConfigManager::try_load(paths),
            Err(ConfigError::UnknownKey { .. })
        ));
    }

    #[test]
    fn reload_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_layers(dir.path(), None, None);
        let manager = ConfigManager::try_load(paths).unwrap();
        assert_eq!(manager.snapshot().version, 1);

        let v2 = manager.reload().unwrap();
        assert_eq!(v2, 2);
        assert_eq!(manager.snapshot().version, 2);
    }

    #[test]
    fn missing_base_falls_back_to_defaults() {
        let manager = ConfigManager::load(LayeredPaths::base_only("/nonexistent/base.toml"));
        let snapshot = manager.snapshot();
        // Legacy mode: compiled-in defaults, flag off.
        assert!(!snapshot.config_driven());
        assert_eq!(snapshot.thresholds.similarity, 0.88);
    }
}
