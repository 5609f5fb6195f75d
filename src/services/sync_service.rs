//! src/services/sync_service.rs
//!
//! Pulls new files from one Dropbox folder into the local downloads
//! directory. A remote file counts as synced as soon as a local file with the
//! same name exists; contents are never compared, so a remote file that is
//! modified in place is not fetched again.

use crate::{
    models::remote::{FileMetadata, Metadata},
    services::{
        dropbox_client::{DropboxClient, DropboxError},
        fs_service::{TEMP_PREFIX, is_plain_file_name, is_scratch_file_name, scratch_file_name},
    },
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Dropbox(#[from] DropboxError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Outcome of one sync cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Clone)]
pub struct SyncService {
    client: DropboxClient,
    remote_folder: String,
    downloads_dir: PathBuf,
}

impl SyncService {
    pub fn new(
        client: DropboxClient,
        remote_folder: impl Into<String>,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            remote_folder: remote_folder.into(),
            downloads_dir: downloads_dir.into(),
        }
    }

    /// Run one sync cycle. The first listing or download failure ends the
    /// cycle; files fetched before it stay in place.
    pub async fn run_once(&self) -> SyncResult<SyncReport> {
        let entries = self.client.list_folder_all(&self.remote_folder).await?;
        let mut report = SyncReport::default();

        for entry in entries {
            let file = match entry {
                Metadata::File(file) => file,
                other => {
                    debug!("Ignoring non-file entry: {}", other.name());
                    continue;
                }
            };

            if !is_plain_file_name(&file.name) || is_scratch_file_name(&file.name) {
                warn!("Skipping remote file with unusable name: {:?}", file.name);
                continue;
            }

            let local_path = self.downloads_dir.join(&file.name);
            if fs::try_exists(&local_path).await? {
                info!("File already exists: {}", file.name);
                report.skipped.push(file.name);
                continue;
            }

            info!("Downloading new file: {}", file.name);
            self.download_to(&file, &local_path).await?;
            info!("Downloaded: {}", file.name);
            report.downloaded.push(file.name);
        }

        Ok(report)
    }

    /// Stream a remote file into a temporary sibling, then rename it into place.
    async fn download_to(&self, file: &FileMetadata, local_path: &Path) -> SyncResult<()> {
        let mut response = self.client.download(file.remote_path()).await?;
        let tmp_path = self.downloads_dir.join(scratch_file_name(TEMP_PREFIX));
        let mut out = File::create(&tmp_path).await?;

        let written = async {
            while let Some(chunk) = response.chunk().await.map_err(DropboxError::from)? {
                out.write_all(&chunk).await?;
            }
            out.flush().await?;
            out.sync_all().await?;
            Ok::<(), SyncError>(())
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }
        drop(out);

        if let Err(err) = fs::rename(&tmp_path, local_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SyncError::Io(err));
        }
        Ok(())
    }

    /// Start the background poller. The first cycle runs one `period` after
    /// start; cycles never overlap, and a slow cycle delays the next tick.
    /// Cancelling `cancel` also abandons a cycle in progress; a download cut
    /// short that way leaves only a scratch file behind.
    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> SyncPoller {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "Dropbox sync every {:?} from {} into {}",
                period,
                self.remote_folder,
                self.downloads_dir.display()
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Dropbox sync poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = token.cancelled() => {
                                info!("Dropbox sync poller stopped during a cycle");
                                break;
                            }
                            result = self.run_once() => match result {
                                Ok(report) => debug!(
                                    "Sync cycle finished: {} downloaded, {} already present",
                                    report.downloaded.len(),
                                    report.skipped.len()
                                ),
                                Err(err) => error!("Error downloading files: {}", err),
                            },
                        }
                    }
                }
            }
        });

        SyncPoller { cancel, handle }
    }
}

/// Handle owning the background sync task.
pub struct SyncPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SyncPoller {
    /// Cancel the poller and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            warn!("Sync poller task ended abnormally: {}", err);
        }
    }
}
