//! Storage layer: typed record persistence and blob storage for rendered documents.

mod error;
pub use error::{Collection, StoreError};

pub mod gateway;
pub use gateway::{FileEntry, RecordStore};

mod memory;
pub use memory::MemoryStore;

mod objects;
pub use objects::{FsObjectStore, ObjectStorage};
