//! Ordered request pipeline: authenticate, authorize, translate the query.
//!
//! Each stage short-circuits the request on failure. The stages are plain
//! functions over [`RequestContext`] so they can be exercised without HTTP;
//! [`protect`] wires them onto a router as axum middleware.

use std::sync::Arc;

use axum::http::Method;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use thiserror::Error;
use tower::ServiceBuilder;

use super::access::verify_roles_middleware;
use super::auth::jwt_auth_middleware;
use super::context::RequestContext;
use super::query::query_defaults_middleware;
use crate::auth::{self, AuthError, DenyReason};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::filter::{Filter, FilterError, OptionKeywords, QueryString, RawQuery};

/// Per-route settings for the pipeline.
#[derive(Clone)]
pub struct RouteConfig {
    secret: Arc<str>,
    option_keywords: Arc<OptionKeywords>,
    max_nested_depth: usize,
    refresh_cookie_name: Arc<str>,
    debug_logging: bool,
}

impl RouteConfig {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
            option_keywords: Arc::new(OptionKeywords::default()),
            max_nested_depth: 5,
            refresh_cookie_name: Arc::from("refreshToken"),
            debug_logging: false,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.security.jwt_secret.as_str())
            .with_max_nested_depth(config.filter.max_nested_depth)
            .with_refresh_cookie_name(config.security.refresh_cookie_name.as_str())
            .with_debug_logging(config.filter.debug_logging)
    }

    pub fn with_option_keywords(mut self, keywords: OptionKeywords) -> Self {
        self.option_keywords = Arc::new(keywords);
        self
    }

    pub fn with_max_nested_depth(mut self, depth: usize) -> Self {
        self.max_nested_depth = depth;
        self
    }

    pub fn with_refresh_cookie_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.refresh_cookie_name = name.into();
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn option_keywords(&self) -> &OptionKeywords {
        &self.option_keywords
    }

    pub fn refresh_cookie_name(&self) -> &str {
        &self.refresh_cookie_name
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("access denied: {0}")]
    Denied(DenyReason),

    #[error(transparent)]
    Query(#[from] FilterError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Auth(e) => e.into(),
            PipelineError::Denied(_) => ApiError::PermissionDenied,
            PipelineError::Query(e) => e.into(),
        }
    }
}

/// Methods whose query string is translated into a filter triple.
pub fn translates_query(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::PUT | Method::PATCH)
}

/// Stage 1: turn the `Authorization` header into an identity.
pub fn authenticate(config: &RouteConfig, authorization: Option<&str>) -> Result<RequestContext, AuthError> {
    auth::verify(authorization, config.secret()).map(RequestContext::authenticated)
}

/// Stage 2: apply the method/role/path table.
pub fn authorize(context: RequestContext, method: &Method, path: &str) -> Result<RequestContext, PipelineError> {
    let decision = auth::decide(context.identity(), method, path);
    if !decision.allow {
        let reason = decision.reason.unwrap_or(DenyReason::InsufficientRole);
        return Err(PipelineError::Denied(reason));
    }
    Ok(context.with_decision(decision))
}

/// Stage 3: translate the query string for read and update requests.
pub fn translate(
    config: &RouteConfig,
    context: RequestContext,
    method: &Method,
    raw_query: Option<&str>,
) -> Result<RequestContext, FilterError> {
    if !translates_query(method) {
        return Ok(context);
    }
    let raw: RawQuery = match raw_query {
        Some(raw) => QueryString::parse(raw, config.max_nested_depth)?,
        None => RawQuery::new(),
    };
    let parsed = Filter::translate(&raw, config.option_keywords())?;
    Ok(context.with_query(parsed))
}

/// Run all three stages in order.
pub fn run(
    config: &RouteConfig,
    authorization: Option<&str>,
    method: &Method,
    path: &str,
    raw_query: Option<&str>,
) -> Result<RequestContext, PipelineError> {
    let context = authenticate(config, authorization)?;
    let context = authorize(context, method, path)?;
    Ok(translate(config, context, method, raw_query)?)
}

/// Put every route of `router` behind the pipeline.
pub fn protect<S>(router: Router<S>, config: RouteConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(config.clone(), jwt_auth_middleware))
            .layer(from_fn(verify_roles_middleware))
            .layer(from_fn_with_state(config, query_defaults_middleware)),
    )
}
