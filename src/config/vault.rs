use serde::{Deserialize, Serialize};

/// Credential-encryption settings (see `vault` table in config.toml).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VaultConfig {
    /// Master key for encrypting credentials at rest. Required, at least
    /// 32 bytes of high-entropy data.
    /// TOML: `vault.master_key`. Must be provided.
    #[serde(default)]
    pub master_key: String,
}
