use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Per-user passbook directory holding config.toml.
pub fn passbook_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".passbook"))
}

/// Like [`passbook_home`], but creates the directory so config.toml can be
/// written into it.
pub fn ensure_passbook_home() -> Result<PathBuf> {
    let dir = passbook_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
