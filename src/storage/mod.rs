pub mod index_store;

pub use index_store::{IndexStore, SplitRef, INDEX_FILE_NAME};
