//! User/role/operation directory backing the authorization gate.

pub mod memory;
pub mod seed;

pub use memory::InMemoryDirectory;
pub use seed::{load_seed, DirectorySeed};
