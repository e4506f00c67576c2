use axum::{
    extract::{OriginalUri, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::RequestContext;
use super::pipeline::{self, PipelineError};
use crate::error::ApiError;

/// Path as the client sent it, even when the router is nested
pub(crate) fn request_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Applies the role table to the authenticated caller
pub async fn verify_roles_middleware(mut request: Request, next: Next) -> Response {
    let Some(context) = request.extensions_mut().remove::<RequestContext>() else {
        return ApiError::unauthorized("Authentication required before role verification").into_response();
    };

    let path = request_path(&request);
    let method = request.method().clone();
    let username = context.identity().username.clone();

    match pipeline::authorize(context, &method, &path) {
        Ok(context) => {
            tracing::debug!("Access granted to '{}' for {} {}", username, method, path);
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err @ PipelineError::Denied(_)) => {
            tracing::warn!("Access denied to '{}' for {} {}: {}", username, method, path, err);
            ApiError::from(err).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}
