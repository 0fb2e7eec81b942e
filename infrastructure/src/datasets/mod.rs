//! Dataset collaborators backed by the local file system.

mod local_store;

pub use local_store::LocalDatasetStore;
