//! Check-record stores.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage for tests and one-shot runs
//! - `FileStore` - A single JSON file, for the CLI

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;
