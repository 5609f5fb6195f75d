use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_REMOTE_FOLDER: &str = "/Apps/ContentAI";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 120;
const DEFAULT_BODY_LIMIT_BYTES: usize = 512 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub downloads_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub dropbox_token: String,
    pub remote_folder: String,
    pub sync_interval: Duration,
    pub body_limit_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Archive upload and Dropbox sync service")]
pub struct Args {
    /// Host to bind to (overrides CONTENT_SYNC_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CONTENT_SYNC_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory receiving synced files, served under /files (overrides CONTENT_SYNC_DOWNLOADS_DIR)
    #[arg(long)]
    pub downloads_dir: Option<PathBuf>,

    /// Directory receiving uploaded archives (overrides CONTENT_SYNC_UPLOADS_DIR)
    #[arg(long)]
    pub uploads_dir: Option<PathBuf>,

    /// Dropbox access token (overrides DROPBOX_ACCESS_TOKEN)
    #[arg(long)]
    pub dropbox_token: Option<String>,

    /// Remote folder polled for new files (overrides CONTENT_SYNC_REMOTE_FOLDER)
    #[arg(long)]
    pub remote_folder: Option<String>,

    /// Seconds between sync cycles (overrides CONTENT_SYNC_INTERVAL_SECS)
    #[arg(long)]
    pub sync_interval_secs: Option<u64>,

    /// Maximum accepted upload size in bytes (overrides CONTENT_SYNC_BODY_LIMIT)
    #[arg(long)]
    pub body_limit_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse `.env`, environment variables and CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        dotenvy::dotenv().ok();
        let args = Args::parse();
        Self::merge(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values looked up through `lookup`, falling back to defaults.
    pub fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_host = lookup("CONTENT_SYNC_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port_var = ["CONTENT_SYNC_PORT", "PORT"]
            .into_iter()
            .find_map(|key| lookup(key).map(|value| (key, value)));
        let env_port = match port_var {
            Some((key, value)) => parse_var(key, &value)?,
            None => 3000,
        };
        let env_downloads =
            lookup("CONTENT_SYNC_DOWNLOADS_DIR").unwrap_or_else(|| "./downloads".into());
        let env_uploads = lookup("CONTENT_SYNC_UPLOADS_DIR").unwrap_or_else(|| "./uploads".into());
        let env_remote =
            lookup("CONTENT_SYNC_REMOTE_FOLDER").unwrap_or_else(|| DEFAULT_REMOTE_FOLDER.into());
        let env_interval = match lookup("CONTENT_SYNC_INTERVAL_SECS") {
            Some(value) => parse_var("CONTENT_SYNC_INTERVAL_SECS", &value)?,
            None => DEFAULT_SYNC_INTERVAL_SECS,
        };
        let env_body_limit = match lookup("CONTENT_SYNC_BODY_LIMIT") {
            Some(value) => parse_var("CONTENT_SYNC_BODY_LIMIT", &value)?,
            None => DEFAULT_BODY_LIMIT_BYTES,
        };

        let dropbox_token = args
            .dropbox_token
            .or_else(|| lookup("DROPBOX_ACCESS_TOKEN"))
            .filter(|token| !token.trim().is_empty())
            .context("DROPBOX_ACCESS_TOKEN must be set")?;

        let interval_secs = args.sync_interval_secs.unwrap_or(env_interval);
        if interval_secs == 0 {
            bail!("sync interval must be at least one second");
        }

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            downloads_dir: args.downloads_dir.unwrap_or_else(|| env_downloads.into()),
            uploads_dir: args.uploads_dir.unwrap_or_else(|| env_uploads.into()),
            dropbox_token,
            remote_folder: args.remote_folder.unwrap_or(env_remote),
            sync_interval: Duration::from_secs(interval_secs),
            body_limit_bytes: args.body_limit_bytes.unwrap_or(env_body_limit),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("downloads_dir", &self.downloads_dir)
            .field("uploads_dir", &self.uploads_dir)
            .field("dropbox_token", &"<redacted>")
            .field("remote_folder", &self.remote_folder)
            .field("sync_interval", &self.sync_interval)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish()
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("parsing {} value `{}`", name, value))
}
