//! Minimal Dropbox API v2 client: folder listing (with pagination) and
//! file download.

use crate::models::remote::{ListFolderPage, Metadata};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";

#[derive(Debug, Error)]
pub enum DropboxError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("encoding request argument failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct CursorArg<'a> {
    cursor: &'a str,
}

#[derive(Clone)]
pub struct DropboxClient {
    http: Client,
    api_url: Url,
    content_url: Url,
    token: String,
}

impl DropboxClient {
    pub fn new(token: impl Into<String>) -> Result<Self, DropboxError> {
        Self::with_base_urls(DEFAULT_API_URL, DEFAULT_CONTENT_URL, token)
    }

    /// Point the client at custom RPC and content hosts.
    pub fn with_base_urls(
        api_url: &str,
        content_url: &str,
        token: impl Into<String>,
    ) -> Result<Self, DropboxError> {
        Ok(Self {
            http: Client::new(),
            api_url: Url::parse(api_url)?,
            content_url: Url::parse(content_url)?,
            token: token.into(),
        })
    }

    /// First page of the listing for `path`.
    pub async fn list_folder(&self, path: &str) -> Result<ListFolderPage, DropboxError> {
        let url = self.api_url.join("/2/files/list_folder")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&PathArg { path })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderPage, DropboxError> {
        let url = self.api_url.join("/2/files/list_folder/continue")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&CursorArg { cursor })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Every entry of `path`, following `has_more` cursors until exhausted.
    pub async fn list_folder_all(&self, path: &str) -> Result<Vec<Metadata>, DropboxError> {
        let mut page = self.list_folder(path).await?;
        let mut entries = Vec::new();
        loop {
            entries.append(&mut page.entries);
            if !page.has_more {
                break;
            }
            page = self.list_folder_continue(&page.cursor).await?;
        }
        Ok(entries)
    }

    /// Start downloading `path`. The body is left unread so callers can stream it.
    pub async fn download(&self, path: &str) -> Result<reqwest::Response, DropboxError> {
        let url = self.content_url.join("/2/files/download")?;
        let arg = serde_json::to_string(&PathArg { path })?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", ascii_safe_json(&arg))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DropboxError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> DropboxError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        DropboxError::Api { status, body }
    }
}

/// HTTP header values must be ASCII; Dropbox expects non-ASCII characters in
/// `Dropbox-API-Arg` escaped as `\uXXXX`.
fn ascii_safe_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
