//! Bootstrap helpers for the gateway.
//!
//! Upstream credentials usually live in `~/.ouf/.env` so the gateway can be
//! started from any working directory.
//!
//! File: `~/.ouf/.env` (standard dotenvy format)

use std::path::{Path, PathBuf};

/// Base directory for gateway state: `~/.ouf`.
pub fn ouf_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ouf")
}

/// Path to the gateway-specific `.env` file: `~/.ouf/.env`.
pub fn ouf_env_path() -> PathBuf {
    ouf_dir().join(".env")
}

/// Load env vars from `~/.ouf/.env` (in addition to the standard `.env`).
///
/// Call this **after** `dotenvy::dotenv()` so that the standard `./.env`
/// takes priority over `~/.ouf/.env`. dotenvy never overwrites existing
/// env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.ouf/.env`
pub fn load_ouf_env() {
    load_env_file(&ouf_env_path());
}

/// Load a dotenv file if it exists. Returns whether anything was loaded.
pub fn load_env_file(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Warning: failed to load {}: {}", path.display(), e);
            false
        }
    }
}
