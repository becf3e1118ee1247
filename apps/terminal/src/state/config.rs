//! # Configuration State
//!
//! Display settings used when printing and listing.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`KERVY_*`)
//! 2. Defaults (this file)
//!
//! Cloud, connectivity and storage settings live in
//! [`kervy_sync::SyncConfig`]; this struct only covers what the operator sees.

use serde::{Deserialize, Serialize};

/// Application display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name used when the profile has none
    pub store_name: Option<String>,

    /// Currency symbol printed before amounts
    pub currency_symbol: String,
}

impl Default for ConfigState {
    /// Peso symbol as `P`; most thermal printers lack `₱`.
    fn default() -> Self {
        ConfigState {
            store_name: None,
            currency_symbol: "P".to_string(),
        }
    }
}

impl ConfigState {
    /// Defaults overridden by the process environment.
    ///
    /// ## Environment Variables
    /// - `KERVY_STORE_NAME`: fallback store name
    /// - `KERVY_CURRENCY`: currency symbol
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(name) = lookup("KERVY_STORE_NAME").filter(|n| !n.trim().is_empty()) {
            config.store_name = Some(name);
        }
        if let Some(symbol) = lookup("KERVY_CURRENCY").filter(|s| !s.trim().is_empty()) {
            config.currency_symbol = symbol;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ConfigState::default();
        assert_eq!(config.currency_symbol, "P");
        assert!(config.store_name.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KERVY_STORE_NAME", "Kervy's Kakanin"),
            ("KERVY_CURRENCY", "PHP"),
        ]
        .into_iter()
        .collect();

        let config = ConfigState::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.store_name.as_deref(), Some("Kervy's Kakanin"));
        assert_eq!(config.currency_symbol, "PHP");
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = ConfigState::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config, ConfigState::default());
    }
}
