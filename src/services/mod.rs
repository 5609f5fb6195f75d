pub mod dropbox_client;
pub mod extract_service;
pub mod fs_service;
pub mod sync_service;
