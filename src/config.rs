//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote row store connection.
    pub gateway: GatewayCfg,
    /// Product lookup tuning.
    #[serde(default)]
    pub lookup: LookupCfg,
    /// Where the signed-in session is cached.
    #[serde(default)]
    pub session: SessionCfg,
}

/// Connection settings for the hosted REST + auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayCfg {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public anon key for the project.
    pub anon_key: String,
    /// Upper bound for every HTTP call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Product lookup behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupCfg {
    /// Quiet period after the last keystroke before a lookup is sent.
    pub debounce_ms: u64,
}

/// Session cache location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCfg {
    pub store_path: String,
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for LookupCfg {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            store_path: "session.json".into(),
        }
    }
}

impl LookupCfg {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    /// True while the gateway cannot be reached for lack of settings.
    pub fn needs_setup(&self) -> bool {
        self.gateway.url.trim().is_empty() || self.gateway.anon_key.trim().is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayCfg {
                url: "".into(),
                anon_key: "".into(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            lookup: LookupCfg::default(),
            session: SessionCfg::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_or_default(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        assert!(cfg.needs_setup());
        assert_eq!(cfg.lookup.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_saved_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.gateway.url = "https://workshop.example.com".into();
        cfg.gateway.anon_key = "anon".into();
        cfg.lookup.debounce_ms = 250;
        cfg.save(&path).unwrap();

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert!(!loaded.needs_setup());
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [gateway]
            url = "https://workshop.example.com"
            anon_key = "anon"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gateway.request_timeout_secs, 15);
        assert_eq!(cfg.lookup.debounce_ms, 500);
        assert_eq!(cfg.session.store_path, "session.json");
    }
}
