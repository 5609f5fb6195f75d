use std::path::PathBuf;

/// Shared state handed to every handler. All mutable state lives on disk.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Files pulled from Dropbox; listed by `/api/files` and served under `/files`.
    pub downloads_dir: PathBuf,

    /// Uploaded archives and the directories they are extracted into.
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(downloads_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            uploads_dir: uploads_dir.into(),
        }
    }
}
