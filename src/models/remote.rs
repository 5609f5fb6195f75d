//! Entries reported by the Dropbox folder listing API.

use serde::Deserialize;

/// One listing entry, discriminated by Dropbox's `.tag` field.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

impl Metadata {
    pub fn name(&self) -> &str {
        match self {
            Metadata::File(file) => &file.name,
            Metadata::Folder(folder) => &folder.name,
            Metadata::Deleted(deleted) => &deleted.name,
        }
    }
}

/// A file stored in the remote folder.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    /// Last path component, used as the local file name.
    pub name: String,

    /// Stable Dropbox identifier (`id:...`).
    pub id: String,

    /// Lowercased full path; absent for entries the caller cannot address by path.
    #[serde(default)]
    pub path_lower: Option<String>,
}

impl FileMetadata {
    /// Path handed to the download endpoint. Dropbox accepts ids in place of paths.
    pub fn remote_path(&self) -> &str {
        self.path_lower.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FolderMetadata {
    pub name: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeletedMetadata {
    pub name: String,
}

/// One page of `list_folder` / `list_folder/continue` results.
#[derive(Deserialize, Clone, Debug)]
pub struct ListFolderPage {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}
