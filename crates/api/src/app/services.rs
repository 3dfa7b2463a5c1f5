//! Shared services behind the HTTP handlers.

use std::sync::Arc;

use backoffice_core::DomainResult;
use backoffice_infra::directory::{DirectorySeed, InMemoryDirectory};
use backoffice_infra::records::{InMemoryRecordStore, RecordEngine};

/// Everything handlers need, shared through an `Extension`.
#[derive(Debug)]
pub struct AppServices {
    pub directory: Arc<InMemoryDirectory>,
    pub records: RecordEngine<InMemoryRecordStore>,
}

/// Build in-memory services from a directory seed.
pub fn build_services(seed: DirectorySeed) -> DomainResult<AppServices> {
    let directory = Arc::new(InMemoryDirectory::from_seed(seed)?);

    Ok(AppServices {
        directory,
        records: RecordEngine::new(InMemoryRecordStore::new()),
    })
}
