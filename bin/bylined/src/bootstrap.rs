//! First-start checks and admin account seeding.
//!
//! When bylined starts:
//! 1. Verify the config names a data directory and spells the
//!    bootstrap section out completely or not at all.
//! 2. Seed the configured admin account if it does not exist yet.

use blog::BlogModule;
use tracing::info;

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }

    let b = &config.bootstrap;
    let set = [&b.admin_username, &b.admin_email, &b.admin_password_hash]
        .iter()
        .filter(|v| !v.is_empty())
        .count();
    if set != 0 && set != 3 {
        anyhow::bail!(
            "Bootstrap admin needs admin_username, admin_email, and \
             admin_password_hash set together (or none of them)."
        );
    }
    Ok(())
}

/// Seed the configured admin account. An absent bootstrap section
/// means no seeding; a partial one was already rejected by
/// [`verify_config`].
pub fn ensure_admin_account(module: &BlogModule, config: &ServerConfig) -> anyhow::Result<()> {
    let b = &config.bootstrap;
    if b.admin_username.is_empty() {
        info!("no bootstrap admin configured");
        return Ok(());
    }

    let account = module
        .service()
        .ensure_admin(&b.admin_username, &b.admin_email, &b.admin_password_hash)
        .map_err(|e| anyhow::anyhow!("failed to ensure admin account: {}", e))?;
    info!(username = %account.username, "admin account ready");
    Ok(())
}
