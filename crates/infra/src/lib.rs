//! Infrastructure layer: in-memory directory, record storage, seed loading.

pub mod directory;
pub mod records;
