//! `GET /api/files`: names of everything in the downloads directory.

use crate::{errors::AppError, services::fs_service::is_scratch_file_name, state::AppState};
use axum::{Json, extract::State};
use std::{io, path::Path};
use tokio::fs;
use tracing::{error, info};

/// List entry names (files and subdirectories, non-recursive) in the
/// downloads directory, sorted by name. In-flight scratch files are left out.
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    info!("GET /api/files called");
    match read_entry_names(&state.downloads_dir).await {
        Ok(names) => Ok(Json(names)),
        Err(err) => {
            error!("Error reading the directory: {}", err);
            Err(AppError::internal("Failed to list files").with_details(err))
        }
    }
}

async fn read_entry_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_scratch_file_name(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
