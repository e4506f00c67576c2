#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use opshub_api::app::build_app;
use opshub_api::auth::{generate_jwt, Claims, Role};
use opshub_api::config::AppConfig;
use opshub_api::database::{Document, DocumentStore, MemoryStore};

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Development profile with the test secret, adjusted by `configure`.
    pub fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::development();
        config.security.jwt_secret = SECRET.to_string();
        config.api.enable_request_logging = false;
        configure(&mut config);

        let store = MemoryStore::new();
        let router = build_app(&config, Arc::new(store.clone()));
        Self { router, store }
    }

    /// Insert a document directly, bypassing the HTTP layer.
    pub async fn seed(&self, collection: &str, document: Value) -> Result<Document> {
        let Value::Object(document) = document else {
            anyhow::bail!("seed documents must be objects");
        };
        Ok(self.store.insert_one(collection, document).await?)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.send(Method::GET, uri, Some(token), None).await
    }
}

pub fn token(user_id: &str, roles: &[Role]) -> String {
    let claims = Claims::new(user_id, format!("{}-name", user_id), roles.iter().copied(), "test-session", 1);
    generate_jwt(&claims, SECRET).expect("failed to mint test token")
}

pub fn employee(user_id: &str) -> String {
    token(user_id, &[Role::Employee])
}

pub fn manager(user_id: &str) -> String {
    token(user_id, &[Role::Manager])
}

/// `_id` values of a list response, in response order.
pub fn ids(body: &Value) -> Vec<String> {
    body["resourceData"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
