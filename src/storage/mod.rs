//! Storage abstraction for index directories.
//!
//! A storage location is a flat, directory-like namespace of byte-oriented
//! files. Commit files are published into it atomically via rename.

pub mod file;
pub mod memory;
pub mod structured;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use structured::{StructReader, StructWriter};
pub use traits::{Storage, StorageConfig, StorageError, StorageInput, StorageOutput};
