//! # Sync Configuration
//!
//! Configuration for the sync layer: device identity, Firebase endpoints,
//! the reachability probe and local storage location.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KERVY_FIREBASE_PROJECT_ID=kervy-pos                                │
//! │     KERVY_PROBE_HOST=firestore.googleapis.com                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kervypos/kervy.toml (Linux)                              │
//! │     ~/Library/Application Support/ph.kervy.pos/kervy.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Google endpoints, 5s probe interval, auto-generated device id      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Counter 1"
//!
//! [firebase]
//! project_id = "kervy-pos"
//! api_key = "AIza..."
//! storage_bucket = "kervy-pos.appspot.com"
//!
//! [connectivity]
//! probe_host = "firestore.googleapis.com"
//! probe_port = 443
//! poll_interval_secs = 5
//!
//! [sync]
//! flush_on_startup = true
//!
//! [storage]
//! database_path = "/var/lib/kervy/kervy.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4), generated on first run.
    pub id: String,

    /// Human-readable device name (e.g., "Counter 1").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Kervy Terminal".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Firebase Settings
// =============================================================================

/// Cloud project and endpoint settings.
///
/// The endpoint bases are overridable so tests can point the clients at a
/// local mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseSettings {
    /// Firebase / GCP project id.
    #[serde(default)]
    pub project_id: String,

    /// Web API key used by the Identity Toolkit endpoints.
    #[serde(default)]
    pub api_key: String,

    /// Storage bucket for product images (defaults to `<project>.appspot.com`).
    #[serde(default)]
    pub storage_bucket: Option<String>,

    /// Firestore REST base URL.
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,

    /// Firebase Storage REST base URL.
    #[serde(default = "default_storage_url")]
    pub storage_url: String,

    /// Identity Toolkit REST base URL.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Secure Token REST base URL, used to refresh ID tokens.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_storage_url() -> String {
    "https://firebasestorage.googleapis.com".to_string()
}

fn default_auth_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_token_url() -> String {
    "https://securetoken.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        FirebaseSettings {
            project_id: String::new(),
            api_key: String::new(),
            storage_bucket: None,
            firestore_url: default_firestore_url(),
            storage_url: default_storage_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl FirebaseSettings {
    /// Bucket for image uploads.
    pub fn bucket(&self) -> String {
        self.storage_bucket
            .clone()
            .unwrap_or_else(|| format!("{}.appspot.com", self.project_id))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Connectivity Settings
// =============================================================================

/// Reachability probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// Host the probe opens a TCP connection to.
    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    /// Port the probe connects to.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Interval between probes (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Probe connect timeout (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_probe_host() -> String {
    "firestore.googleapis.com".to_string()
}

fn default_probe_port() -> u16 {
    443
}

fn default_poll_interval() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    3
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            probe_host: default_probe_host(),
            probe_port: default_probe_port(),
            poll_interval_secs: default_poll_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl ConnectivitySettings {
    pub fn probe_address(&self) -> String {
        format!("{}:{}", self.probe_host, self.probe_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Flush behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Flush the queue at startup when the device is already online.
    #[serde(default = "default_true")]
    pub flush_on_startup: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            flush_on_startup: true,
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Local storage location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file holding the offline queue. Defaults to the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub firebase: FirebaseSettings,

    #[serde(default)]
    pub connectivity: ConnectivitySettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kervy.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.is_empty() {
            return Err(SyncError::InvalidConfig("device.id must not be empty".into()));
        }

        for (name, raw) in [
            ("firestore_url", &self.firebase.firestore_url),
            ("storage_url", &self.firebase.storage_url),
            ("auth_url", &self.firebase.auth_url),
            ("token_url", &self.firebase.token_url),
        ] {
            let parsed = url::Url::parse(raw)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "{} must be http(s), got: {}",
                    name, raw
                )));
            }
        }

        if self.connectivity.probe_host.trim().is_empty() || self.connectivity.probe_port == 0 {
            return Err(SyncError::InvalidConfig(
                "connectivity probe needs a host and a non-zero port".into(),
            ));
        }

        if self.connectivity.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `KERVY_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("KERVY_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(name) = lookup("KERVY_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Some(project) = lookup("KERVY_FIREBASE_PROJECT_ID") {
            debug!(project = %project, "Overriding Firebase project from environment");
            self.firebase.project_id = project;
        }

        if let Some(key) = lookup("KERVY_FIREBASE_API_KEY") {
            self.firebase.api_key = key;
        }

        if let Some(bucket) = lookup("KERVY_FIREBASE_BUCKET") {
            self.firebase.storage_bucket = Some(bucket);
        }

        if let Some(url) = lookup("KERVY_FIRESTORE_URL") {
            self.firebase.firestore_url = url;
        }

        if let Some(url) = lookup("KERVY_STORAGE_URL") {
            self.firebase.storage_url = url;
        }

        if let Some(url) = lookup("KERVY_AUTH_URL") {
            self.firebase.auth_url = url;
        }

        if let Some(url) = lookup("KERVY_TOKEN_URL") {
            self.firebase.token_url = url;
        }

        if let Some(host) = lookup("KERVY_PROBE_HOST") {
            self.connectivity.probe_host = host;
        }

        if let Some(port) = lookup("KERVY_PROBE_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.connectivity.probe_port = p,
                Err(_) => warn!(port = %port, "Ignoring invalid KERVY_PROBE_PORT"),
            }
        }

        if let Some(secs) = lookup("KERVY_POLL_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.connectivity.poll_interval_secs = s,
                Err(_) => warn!(secs = %secs, "Ignoring invalid KERVY_POLL_INTERVAL_SECS"),
            }
        }

        if let Some(path) = lookup("KERVY_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("ph", "kervy", "pos")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("kervy.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// True when enough Firebase settings are present to talk to the cloud.
    pub fn is_cloud_configured(&self) -> bool {
        !self.firebase.project_id.is_empty() && !self.firebase.api_key.is_empty()
    }

    /// Resolved path of the local SQLite file.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("kervy.db")))
            .unwrap_or_else(|| PathBuf::from("kervy.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty());
        assert_eq!(config.connectivity.probe_address(), "firestore.googleapis.com:443");
        assert!(config.sync.flush_on_startup);
        assert!(!config.is_cloud_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.device.id = String::new();
        assert!(config.validate().is_err());

        config.device.id = "counter-1".to_string();
        config.firebase.firestore_url = "ftp://firestore".to_string();
        assert!(config.validate().is_err());

        config.firebase.firestore_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.firebase.firestore_url = "http://127.0.0.1:8080".to_string();
        assert!(config.validate().is_ok());

        config.connectivity.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("KERVY_FIREBASE_PROJECT_ID", "kervy-pos"),
            ("KERVY_FIREBASE_API_KEY", "key-123"),
            ("KERVY_PROBE_PORT", "8443"),
            ("KERVY_POLL_INTERVAL_SECS", "not-a-number"),
            ("KERVY_DB_PATH", "/tmp/kervy-test.db"),
            ("KERVY_TOKEN_URL", "http://127.0.0.1:9099"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert!(config.is_cloud_configured());
        assert_eq!(config.firebase.bucket(), "kervy-pos.appspot.com");
        assert_eq!(config.connectivity.probe_port, 8443);
        assert_eq!(config.connectivity.poll_interval_secs, 5);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/kervy-test.db"));
        assert_eq!(config.firebase.token_url, "http://127.0.0.1:9099");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kervy.toml");
        std::fs::write(
            &path,
            r#"
            [device]
            id = "counter-9"

            [firebase]
            project_id = "kervy-pos"
            api_key = "abc"
            storage_bucket = "kervy-images"

            [sync]
            flush_on_startup = false
            "#,
        )
        .unwrap();

        let config = SyncConfig::load(Some(path)).unwrap();
        assert_eq!(config.device_id(), "counter-9");
        assert_eq!(config.firebase.bucket(), "kervy-images");
        assert!(!config.sync.flush_on_startup);
        assert_eq!(config.connectivity.poll_interval_secs, 5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kervy.toml");

        let mut config = SyncConfig::default();
        config.device.name = "Counter 2".to_string();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[device]"));
        assert!(contents.contains("[firebase]"));

        let reloaded: SyncConfig = toml::from_str(&contents).unwrap();
        assert_eq!(reloaded.device.name, "Counter 2");
        assert_eq!(reloaded.device.id, config.device.id);
    }
}
