// mimir-service/src/services/mod.rs
use crate::store::{ObjectStore, RecordStore, UrlSigner};
use std::sync::Arc;

pub mod authorization;
pub mod resource_service;

// Capability handles every handler works against. Constructed once in main
// and injected through actix's app data; nothing reaches for a global client.
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub signer: UrlSigner,
}
