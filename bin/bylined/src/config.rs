//! Server configuration.
//!
//! Reads a TOML file resolved from a context name
//! (`/etc/byline/<name>.toml`) or a literal path.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Server configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    pub storage: StorageConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Listen address for the HTTP server.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding all persistent data.
    pub data_dir: String,
}

/// Admin account seeded at startup. All three fields must be set
/// together, or all left empty to skip seeding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_username: String,

    #[serde(default)]
    pub admin_email: String,

    /// Credential hash for the admin account. Hashing happens outside
    /// this server; plaintext never belongs in the config.
    #[serde(default)]
    pub admin_password_hash: String,
}

impl ServerConfig {
    /// Resolve a context name to `/etc/byline/<name>.toml`. Anything
    /// containing a `/` or `.` is taken as a literal path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/byline/{}.toml", name_or_path))
        }
    }

    /// Load config from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
