use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{FilterError, ParsedQuery, Projection};

/// A stored document; `_id`, `createdAt`, `updatedAt` and `__v` are managed by the store
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Execution options derived from the `options` half of a [`ParsedQuery`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindOptions {
    pub sort: Option<Value>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn from_query(query: &ParsedQuery, max_limit: Option<u64>) -> Result<Self, FilterError> {
        let pagination = query.pagination(max_limit)?;
        Ok(Self {
            sort: query.sort().cloned(),
            skip: pagination.skip,
            limit: pagination.limit,
        })
    }
}

/// The document database the resource handlers talk to.
///
/// Filters use the `$`-prefixed comparison operators produced by the query
/// translator; updates are merged field by field (or through `$set`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Projection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Projection,
    ) -> Result<Option<Document>, StoreError>;

    async fn count_documents(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

    /// Returns the updated document, or `None` when nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn update_many(&self, collection: &str, filter: &Document, update: &Document) -> Result<u64, StoreError>;

    async fn delete_one(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;
}
