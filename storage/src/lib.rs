pub mod crypto;
pub mod hyper_index;
pub mod index;
pub mod repo;
pub mod snapshot;
pub mod wal;

pub use hyper_index::HyperIndex;
pub use repo::{RepoError, Repository};
