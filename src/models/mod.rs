//! Data shapes exchanged with clients and with the Dropbox API.
//!
//! Nothing here is persisted; the filesystem is the only state the
//! service keeps.

pub mod remote;
pub mod upload;
