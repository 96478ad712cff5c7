//! Harness configuration.
//!
//! Settings are read from `~/.docprobe/config.json` (defaults when the file is
//! missing), then overridden by environment variables, then by command-line
//! flags in the binary. The `srcdir` variable is honoured for locating fixture
//! documents so scenarios run unchanged from a build tree.
//!
//! # Example
//!
//! ```no_run
//! use docprobe_core::config::HarnessConfig;
//!
//! let mut config = HarnessConfig::load();
//! config.apply_env(|key| std::env::var(key).ok()).unwrap();
//! println!("testing {}", config.app);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.json";

/// Errors from loading or overriding configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Returns the per-user state directory, `~/.docprobe`.
///
/// Falls back to the system temp directory when no home directory is known.
pub fn docprobe_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".docprobe")
}

fn default_app() -> String {
    "atril".to_string()
}

fn default_locale() -> String {
    "C".to_string()
}

fn default_bridge_command() -> Vec<String> {
    vec!["docprobe-a11y-bridge".to_string()]
}

fn default_launch_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_search_attempts() -> u32 {
    20
}

fn default_search_backoff_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

/// Everything the harness needs to launch and drive the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Application binary to launch.
    #[serde(default = "default_app")]
    pub app: String,

    /// Name the application registers on the accessibility bus.
    /// Defaults to the binary's file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Fixed arguments placed before the file argument.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<String>,

    /// Value forced into `LANG` for the application.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Directory holding fixture documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures_dir: Option<PathBuf>,

    /// Bridge agent command line.
    #[serde(default = "default_bridge_command")]
    pub bridge_command: Vec<String>,

    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,

    /// How often the main frame is polled for during launch.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of widget lookups before giving up.
    #[serde(default = "default_search_attempts")]
    pub search_attempts: u32,

    /// Pause between widget lookups.
    #[serde(default = "default_search_backoff_ms")]
    pub search_backoff_ms: u64,

    /// Where failure diagnostics are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub capture_screenshot: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app: default_app(),
            app_name: None,
            app_args: Vec::new(),
            locale: default_locale(),
            fixtures_dir: None,
            bridge_command: default_bridge_command(),
            launch_timeout_ms: default_launch_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            search_attempts: default_search_attempts(),
            search_backoff_ms: default_search_backoff_ms(),
            diagnostics_dir: None,
            capture_screenshot: true,
        }
    }
}

impl HarnessConfig {
    /// Load config from `~/.docprobe/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&docprobe_dir().join(CONFIG_FILENAME)).unwrap_or_default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Recognised: `srcdir`, `DOCPROBE_APP`, `DOCPROBE_BRIDGE` (whitespace
    /// separated), `DOCPROBE_DIAGNOSTICS_DIR`, `DOCPROBE_LAUNCH_TIMEOUT_MS`,
    /// `DOCPROBE_SEARCH_TIMEOUT_MS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("srcdir").filter(|s| !s.is_empty()) {
            self.fixtures_dir = Some(PathBuf::from(dir));
        }
        if let Some(app) = lookup("DOCPROBE_APP").filter(|s| !s.is_empty()) {
            self.app = app;
        }
        if let Some(bridge) = lookup("DOCPROBE_BRIDGE") {
            let command: Vec<String> = bridge.split_whitespace().map(String::from).collect();
            if command.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "DOCPROBE_BRIDGE",
                    value: bridge,
                });
            }
            self.bridge_command = command;
        }
        if let Some(dir) = lookup("DOCPROBE_DIAGNOSTICS_DIR").filter(|s| !s.is_empty()) {
            self.diagnostics_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup("DOCPROBE_LAUNCH_TIMEOUT_MS") {
            self.launch_timeout_ms = parse_ms("DOCPROBE_LAUNCH_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("DOCPROBE_SEARCH_TIMEOUT_MS") {
            self.set_search_timeout(Duration::from_millis(parse_ms(
                "DOCPROBE_SEARCH_TIMEOUT_MS",
                value,
            )?));
        }
        Ok(())
    }

    /// Spread a total search budget over the configured back-off.
    pub fn set_search_timeout(&mut self, total: Duration) {
        let backoff = self.search_backoff_ms.max(1);
        let attempts = (total.as_millis() as u64).div_ceil(backoff).max(1);
        self.search_attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
    }

    /// Accessibility name of the application.
    pub fn app_name(&self) -> String {
        if let Some(name) = &self.app_name {
            return name.clone();
        }
        Path::new(&self.app)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.app.clone())
    }

    /// Directory fixture names are resolved against.
    pub fn fixtures_dir(&self) -> PathBuf {
        self.fixtures_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Directory failure diagnostics are written under.
    pub fn diagnostics_dir(&self) -> PathBuf {
        self.diagnostics_dir
            .clone()
            .unwrap_or_else(|| docprobe_dir().join("diagnostics"))
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn search_backoff(&self) -> Duration {
        Duration::from_millis(self.search_backoff_ms)
    }
}

fn parse_ms(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_procedural_timing() {
        let config = HarnessConfig::default();
        assert_eq!(config.app, "atril");
        assert_eq!(config.locale, "C");
        assert_eq!(config.search_attempts, 20);
        assert_eq!(config.search_backoff(), Duration::from_millis(500));
        assert_eq!(config.launch_timeout(), Duration::from_secs(30));
        assert!(config.capture_screenshot);
    }

    #[test]
    fn deserialize_empty_json() {
        let config: HarnessConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.app, "atril");
        assert_eq!(config.bridge_command, vec!["docprobe-a11y-bridge"]);
        assert!(config.fixtures_dir.is_none());
    }

    #[test]
    fn roundtrip_serialization() {
        let config = HarnessConfig {
            app: "/usr/bin/xreader".to_string(),
            fixtures_dir: Some(PathBuf::from("/src/test")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.app, config.app);
        assert_eq!(loaded.fixtures_dir, config.fixtures_dir);
    }

    #[test]
    fn app_name_uses_binary_file_name() {
        let config = HarnessConfig {
            app: "/usr/bin/xreader".to_string(),
            ..Default::default()
        };
        assert_eq!(config.app_name(), "xreader");

        let config = HarnessConfig {
            app_name: Some("Atril Document Viewer".to_string()),
            ..Default::default()
        };
        assert_eq!(config.app_name(), "Atril Document Viewer");
    }

    #[test]
    fn env_overrides() {
        let mut config = HarnessConfig::default();
        config
            .apply_env(env(&[
                ("srcdir", "/build/test"),
                ("DOCPROBE_APP", "xreader"),
                ("DOCPROBE_BRIDGE", "python3 -m bridge"),
                ("DOCPROBE_LAUNCH_TIMEOUT_MS", "5000"),
                ("DOCPROBE_SEARCH_TIMEOUT_MS", "2000"),
            ]))
            .unwrap();
        assert_eq!(config.fixtures_dir, Some(PathBuf::from("/build/test")));
        assert_eq!(config.app, "xreader");
        assert_eq!(config.bridge_command, vec!["python3", "-m", "bridge"]);
        assert_eq!(config.launch_timeout_ms, 5000);
        assert_eq!(config.search_attempts, 4);
    }

    #[test]
    fn env_rejects_bad_numbers() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_env(env(&[("DOCPROBE_LAUNCH_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "DOCPROBE_LAUNCH_TIMEOUT_MS",
                ..
            }
        ));
    }

    #[test]
    fn env_rejects_blank_bridge() {
        let mut config = HarnessConfig::default();
        assert!(config.apply_env(env(&[("DOCPROBE_BRIDGE", "  ")])).is_err());
    }

    #[test]
    fn search_timeout_never_drops_below_one_attempt() {
        let mut config = HarnessConfig::default();
        config.set_search_timeout(Duration::ZERO);
        assert_eq!(config.search_attempts, 1);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            HarnessConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            HarnessConfig::load_from(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
