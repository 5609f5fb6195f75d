//! src/services/extract_service.rs
//!
//! Unpacks a stored ZIP archive into a destination directory. Entry paths are
//! rewritten before they touch the disk: characters some filesystems reject
//! become `_`, and anything other than plain path components is dropped, so
//! every entry lands beneath the destination.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

const UNSAFE_CHARS: [char; 7] = [':', '*', '?', '"', '<', '>', '|'];
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Counts reported after a successful extraction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Replace characters invalid on some filesystems and strip everything that
/// is not a normal component (`..`, `.`, roots, drive prefixes).
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_entry_path(raw: &str) -> Option<PathBuf> {
    let replaced: String = raw
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let sanitized: PathBuf = Path::new(&replaced)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Extract every entry of `archive_path` beneath `destination`.
///
/// Blocking; call through [`extract_archive`] from async code. The first
/// read or write failure aborts the run and leaves already written entries
/// in place.
pub fn extract_archive_blocking(
    archive_path: &Path,
    destination: &Path,
) -> ExtractResult<ExtractSummary> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut summary = ExtractSummary::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let raw_name = entry.name().to_string();

        let Some(relative) = sanitize_entry_path(&raw_name) else {
            warn!("Skipping archive entry with unusable path: {:?}", raw_name);
            io::copy(&mut entry, &mut io::sink())?;
            summary.skipped += 1;
            continue;
        };
        let target = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let is_symlink = entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK);
        if is_symlink {
            debug!("Draining symlink entry {:?}", raw_name);
            io::copy(&mut entry, &mut io::sink())?;
            summary.skipped += 1;
            continue;
        }

        let mut writer = BufWriter::new(File::create(&target)?);
        io::copy(&mut entry, &mut writer)?;
        writer.flush()?;
        debug!("Extracted {} -> {}", raw_name, target.display());
        summary.files += 1;
    }

    Ok(summary)
}

/// Async wrapper running the extraction on the blocking thread pool.
pub async fn extract_archive(
    archive_path: PathBuf,
    destination: PathBuf,
) -> ExtractResult<ExtractSummary> {
    tokio::task::spawn_blocking(move || extract_archive_blocking(&archive_path, &destination))
        .await?
}
