//! Generic CRUD handlers shared by every registered resource.
//!
//! Handlers run after the request pipeline, so the caller's identity, the
//! access decision and (for reads and updates) the translated query are
//! already in the [`RequestContext`] extension.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::Value;

use super::resources::Resource;
use crate::auth::OWNER_FIELD;
use crate::database::document::project;
use crate::database::{
    Document, DocumentStore, FindOptions, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::error::ApiError;
use crate::filter::{ParsedQuery, Projection, VERSION_FIELD};
use crate::middleware::{ApiResponse, ApiResult, RequestContext};

/// Router state for one mounted resource.
#[derive(Clone)]
pub struct ResourceState {
    pub store: Arc<dyn DocumentStore>,
    pub resource: Arc<Resource>,
    pub max_limit: Option<u64>,
}

impl ResourceState {
    pub fn new(store: Arc<dyn DocumentStore>, resource: Resource, max_limit: Option<u64>) -> Self {
        Self {
            store,
            resource: Arc::new(resource),
            max_limit,
        }
    }

    fn collection(&self) -> &str {
        self.resource.collection
    }
}

/// Fields the store or the pipeline own; never accepted from a request body.
const MANAGED_FIELDS: [&str; 5] = [ID_FIELD, VERSION_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD, OWNER_FIELD];

fn translated_query(context: &RequestContext) -> Result<&ParsedQuery, ApiError> {
    context
        .query()
        .ok_or_else(|| ApiError::internal_server_error("Request reached handler without a translated query"))
}

fn document_body(body: Value) -> Result<Document, ApiError> {
    match body {
        Value::Object(mut document) => {
            for field in MANAGED_FIELDS {
                document.remove(field);
            }
            Ok(document)
        }
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

fn by_id(filter: &Document, id: &str) -> Document {
    let mut filter = filter.clone();
    filter.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    filter
}

/// GET /r and GET /r/user
pub async fn list(
    State(state): State<ResourceState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Vec<Document>> {
    let query = translated_query(&context)?;
    let options = FindOptions::from_query(query, state.max_limit)?;

    let documents = state
        .store
        .find(state.collection(), &query.filter, &query.projection, &options)
        .await?;
    let total = state.store.count_documents(state.collection(), &query.filter).await?;
    let pages = query.pagination(state.max_limit)?.pages(total);

    tracing::debug!(
        "Listed {} of {} {} for '{}'{}",
        documents.len(),
        total,
        state.resource.name,
        context.identity().username,
        if context.is_self_service() { " (own documents)" } else { "" }
    );

    Ok(ApiResponse::success(documents)
        .with_message(format!("{} list retrieved", state.resource.label))
        .paged(pages, total))
}

/// GET /r/:id
pub async fn show(
    State(state): State<ResourceState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    let query = translated_query(&context)?;
    let filter = by_id(&query.filter, &id);

    let document = state
        .store
        .find_one(state.collection(), &filter, &query.projection)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", state.resource.label, id)))?;

    Ok(ApiResponse::success(document).with_message(format!("{} retrieved", state.resource.label)))
}

/// POST /r
pub async fn create(
    State(state): State<ResourceState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<Value>,
) -> ApiResult<Document> {
    let identity = context.identity();
    if let Some(roles) = state.resource.create_roles {
        if !identity.has_any_role(roles) {
            tracing::warn!("'{}' may not create {}", identity.username, state.resource.name);
            return Err(ApiError::PermissionDenied);
        }
    }

    let mut document = document_body(body)?;
    document.insert(OWNER_FIELD.to_string(), Value::String(identity.user_id.clone()));

    let created = state.store.insert_one(state.collection(), document).await?;
    let created = project(&created, &Projection::default());

    tracing::info!("Created {} for '{}'", state.resource.name, identity.username);
    Ok(ApiResponse::created(created).with_message(format!("{} created", state.resource.label)))
}

/// PUT|PATCH /r/:id and /r/user/:id
pub async fn update(
    State(state): State<ResourceState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Document> {
    let query = translated_query(&context)?;
    let identity = context.identity();
    let changes = document_body(body)?;
    if changes.is_empty() {
        return Err(ApiError::bad_request("No updatable fields supplied"));
    }

    let filter = by_id(&query.filter, &id);
    let existing = state
        .store
        .find_one(state.collection(), &filter, &Projection::Fields(Default::default()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", state.resource.label, id)))?;

    if !state.resource.ownership.permits(&existing, identity) {
        tracing::warn!("'{}' does not own {} {}", identity.username, state.resource.name, id);
        return Err(ApiError::PermissionDenied);
    }

    let updated = state
        .store
        .update_one(state.collection(), &by_id(&Document::new(), &id), &changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", state.resource.label, id)))?;

    Ok(ApiResponse::success(project(&updated, &query.projection))
        .with_message(format!("{} updated", state.resource.label)))
}

/// DELETE /r/:id
pub async fn delete(
    State(state): State<ResourceState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let identity = context.identity();
    let filter = by_id(&Document::new(), &id);

    let existing = state
        .store
        .find_one(state.collection(), &filter, &Projection::Fields(Default::default()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", state.resource.label, id)))?;

    if !state.resource.ownership.permits(&existing, identity) {
        tracing::warn!("'{}' does not own {} {}", identity.username, state.resource.name, id);
        return Err(ApiError::PermissionDenied);
    }

    let deleted = state.store.delete_one(state.collection(), &filter).await?;
    if deleted == 0 {
        return Err(ApiError::not_found(format!("{} {} not found", state.resource.label, id)));
    }

    tracing::info!("Deleted {} {} for '{}'", state.resource.name, id, identity.username);
    Ok(ApiResponse::success(Value::Array(Vec::new()))
        .with_message(format!("{} deleted", state.resource.label)))
}
