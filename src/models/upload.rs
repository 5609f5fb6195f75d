//! Response payload for a successful archive upload.

use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    /// Directory the archive was unpacked into.
    pub extracted_to: String,
}
