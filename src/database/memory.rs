use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::document::{compare_documents, matches, project, sort_keys};
use super::store::{
    Document, DocumentStore, FindOptions, StoreError, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::filter::{Projection, VERSION_FIELD};

/// Process-local document store, one vector per collection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Fields the caller may change; `_id`, `__v` and `createdAt` stay store-managed.
    fn update_fields(update: &Document) -> Result<Document, StoreError> {
        let fields = match update.get("$set") {
            Some(Value::Object(set)) => set.clone(),
            Some(_) => return Err(StoreError::InvalidUpdate("$set must be an object".to_string())),
            None => update.clone(),
        };
        if let Some(key) = fields.keys().find(|key| key.starts_with('$')) {
            return Err(StoreError::InvalidUpdate(format!("unsupported update operator {}", key)));
        }
        Ok(fields
            .into_iter()
            .filter(|(key, _)| key != ID_FIELD && key != VERSION_FIELD && key != CREATED_AT_FIELD)
            .collect())
    }

    fn apply_update(document: &mut Document, fields: &Document, now: &str) {
        for (key, value) in fields {
            document.insert(key.clone(), value.clone());
        }
        let version = document.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
        document.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
        document.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.to_string()));
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Projection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut found = Vec::new();
        for document in documents {
            if matches(document, filter)? {
                found.push(document);
            }
        }

        if let Some(sort) = &options.sort {
            let keys = sort_keys(sort)?;
            found.sort_by(|a, b| compare_documents(a, b, &keys));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .filter(|limit| *limit > 0)
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|document| project(document, projection))
            .collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Projection,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };
        for document in documents {
            if matches(document, filter)? {
                return Ok(Some(project(document, projection)));
            }
        }
        Ok(None)
    }

    async fn count_documents(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(0);
        };
        let mut count = 0;
        for document in documents {
            if matches(document, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Document, StoreError> {
        let now = Self::now();
        document
            .entry(ID_FIELD.to_string())
            .or_insert_with(|| Value::String(Uuid::new_v4().simple().to_string()));
        document.insert(VERSION_FIELD.to_string(), Value::from(0));
        document.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
        document.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|existing| existing.get(ID_FIELD) == document.get(ID_FIELD)) {
            return Err(StoreError::InvalidUpdate("duplicate _id".to_string()));
        }
        documents.push(document.clone());

        tracing::debug!("Inserted document into '{}'", collection);
        Ok(document)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<Option<Document>, StoreError> {
        let fields = Self::update_fields(update)?;
        let now = Self::now();

        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(None);
        };
        for document in documents.iter_mut() {
            if matches(document, filter)? {
                Self::apply_update(document, &fields, &now);
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn update_many(&self, collection: &str, filter: &Document, update: &Document) -> Result<u64, StoreError> {
        let fields = Self::update_fields(update)?;
        let now = Self::now();

        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut updated = 0;
        for document in documents.iter_mut() {
            if matches(document, filter)? {
                Self::apply_update(document, &fields, &now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_one(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        for index in 0..documents.len() {
            if matches(&documents[index], filter)? {
                documents.remove(index);
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        let mut failure = None;
        documents.retain(|document| match matches(document, filter) {
            Ok(matched) => !matched,
            Err(e) => {
                failure.get_or_insert(e);
                true
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        Ok((before - documents.len()) as u64)
    }
}
