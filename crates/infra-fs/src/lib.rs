// Harvest Infrastructure - Filesystem Adapter
// Implements: CheckpointStore

mod checkpoint_store;

pub use checkpoint_store::FsCheckpointStore;
