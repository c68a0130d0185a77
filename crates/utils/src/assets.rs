use std::{env, path::PathBuf};

use directories::ProjectDirs;

const ASSET_DIR_ENV: &str = "CONFDESK_ASSET_DIR";

/// Directory holding the SQLite database and uploaded paper files.
///
/// Resolution order: `CONFDESK_ASSET_DIR` env var, then the platform data
/// directory, then `./assets` as a last resort.
pub fn asset_dir() -> PathBuf {
    if let Ok(dir) = env::var(ASSET_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = ProjectDirs::from("org", "confdesk", "confdesk") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from("./assets")
}

/// Subdirectory for submitted paper files.
pub fn paper_dir() -> PathBuf {
    asset_dir().join("papers")
}
