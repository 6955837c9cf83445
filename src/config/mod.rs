mod basic;
mod orchestration;
mod vault;

pub use basic::BasicConfig;
pub use orchestration::OrchestrationConfig;
pub use vault::VaultConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Pool-manager and workflow settings (see `orchestration` table in
    /// config.toml).
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Credential-encryption settings (see `vault` table in config.toml).
    #[serde(default)]
    pub vault: VaultConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Minimum master key length accepted by the vault, in bytes.
const MIN_MASTER_KEY_BYTES: usize = 32;

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration from the TOML file (with defaults) and validates
    /// required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {}", DEFAULT_CONFIG_FILE);
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if cfg.basic.service_key.trim().is_empty() {
            panic!("basic.service_key must be set and non-empty");
        }
        if cfg.vault.master_key.len() < MIN_MASTER_KEY_BYTES {
            panic!("vault.master_key must be at least {MIN_MASTER_KEY_BYTES} bytes");
        }
        cfg
    }
}
