// Public routes: no authentication, no pipeline
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use super::resources::registry;
use crate::database::{Document, DocumentStore};

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let resources: Vec<String> = registry().iter().map(|resource| resource.path()).collect();

    Json(json!({
        "message": "OpsHub API",
        "resourceData": {
            "name": "OpsHub API",
            "version": version,
            "description": "Role-checked CRUD over business records with URL query filtering",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "resources": resources,
                "routes": "GET /r, GET /r/user, GET /r/:id, POST /r, PUT|PATCH /r/:id, PUT|PATCH /r/user/:id, DELETE /r/:id (bearer token)",
            }
        }
    }))
}

pub async fn health(State(store): State<Arc<dyn DocumentStore>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.count_documents("health", &Document::new()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "message": "ok",
                "resourceData": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "message": "database unavailable",
                    "resourceData": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
