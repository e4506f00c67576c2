pub mod document;
pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{Document, DocumentStore, FindOptions, StoreError, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
