//! `POST /api/upload-zip`: store one uploaded ZIP archive under the uploads
//! directory and extract it next to itself.

use crate::{
    errors::AppError,
    models::upload::UploadResponse,
    services::{
        extract_service::extract_archive,
        fs_service::{TEMP_PREFIX, is_plain_file_name, scratch_file_name},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};
use std::path::{Path, PathBuf};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{error, info};

/// Multipart field carrying the archive.
pub const ZIP_FIELD: &str = "zipFile";

/// Accept a `.zip` upload in the `zipFile` field and extract it into
/// `uploads/<archive stem>`.
pub async fn upload_zip(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (archive_path, file_name) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(multipart_error)?;
        let Some(field) = field else {
            return Err(AppError::bad_request("No ZIP file uploaded"));
        };
        if field.name() != Some(ZIP_FIELD) || field.file_name().is_none() {
            continue;
        }
        break store_archive(&state.uploads_dir, field).await?;
    };

    let stem = Path::new(&file_name)
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_default();
    let extract_to = state.uploads_dir.join(stem);

    let extracted = match fs::create_dir_all(&extract_to).await {
        Ok(()) => extract_archive(archive_path, extract_to.clone()).await,
        Err(err) => Err(err.into()),
    };

    match extracted {
        Ok(summary) => {
            info!(
                "Extracted {} into {} ({} files, {} directories, {} skipped)",
                file_name,
                extract_to.display(),
                summary.files,
                summary.directories,
                summary.skipped
            );
            Ok(Json(UploadResponse {
                message: "ZIP file uploaded and extracted successfully".into(),
                extracted_to: extract_to.display().to_string(),
            }))
        }
        Err(err) => {
            error!("Unzip error: {}", err);
            Err(AppError::internal("Failed to extract ZIP file").with_details(err))
        }
    }
}

/// Validate the client file name and stream the field body to
/// `uploads/<file name>`, replacing any earlier upload with that name.
async fn store_archive(
    uploads_dir: &Path,
    mut field: Field<'_>,
) -> Result<(PathBuf, String), AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();

    if !has_zip_extension(&file_name) {
        return Err(AppError::bad_request("Only ZIP files are allowed"));
    }
    if !is_plain_file_name(&file_name) {
        return Err(AppError::bad_request("Invalid file name"));
    }

    let archive_path = uploads_dir.join(&file_name);
    let tmp_path = uploads_dir.join(scratch_file_name(TEMP_PREFIX));
    let mut file = File::create(&tmp_path)
        .await
        .map_err(|err| AppError::internal("Failed to store ZIP file").with_details(err))?;

    let mut size_bytes: u64 = 0;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(multipart_error(err));
            }
        };
        size_bytes += chunk.len() as u64;
        if let Err(err) = file.write_all(&chunk).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::internal("Failed to store ZIP file").with_details(err));
        }
    }

    let flushed = file.flush().await;
    drop(file);
    let finished = match flushed {
        Ok(()) => fs::rename(&tmp_path, &archive_path).await,
        Err(err) => Err(err),
    };
    if let Err(err) = finished {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(AppError::internal("Failed to store ZIP file").with_details(err));
    }

    info!("Stored upload {} ({} bytes)", archive_path.display(), size_bytes);
    Ok((archive_path, file_name))
}

/// Bodies over the configured limit surface as 413; anything else is a malformed request.
fn multipart_error(err: MultipartError) -> AppError {
    let error = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "ZIP file too large")
    } else {
        AppError::bad_request("Failed to read upload")
    };
    error.with_details(err)
}

fn has_zip_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
