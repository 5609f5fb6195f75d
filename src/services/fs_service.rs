//! Local filesystem helpers shared by startup and the request handlers.

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use tracing::info;
use uuid::Uuid;

/// Prefix of in-flight download and upload files.
pub const TEMP_PREFIX: &str = ".tmp-";
/// Prefix of readiness check files.
pub const READY_CHECK_PREFIX: &str = ".readyz-";

/// Create every directory in `dirs` that does not exist yet, including
/// missing parents. Returns the directories that were actually created.
pub fn ensure_directories_exist(dirs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for dir in dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created {:?} directory", dir);
            created.push(dir.clone());
        }
    }
    Ok(created)
}

/// True when `name` is exactly one normal path component.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Fresh scratch file name starting with `prefix`.
pub fn scratch_file_name(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4())
}

/// True for scratch files created by downloads, uploads or readiness checks.
pub fn is_scratch_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) || name.starts_with(READY_CHECK_PREFIX)
}
