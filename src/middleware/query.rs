use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::RequestContext;
use super::pipeline::{self, RouteConfig};
use crate::error::ApiError;

/// Replaces the raw query string with a `{filter, projection, options}` triple
pub async fn query_defaults_middleware(
    State(config): State<RouteConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(context) = request.extensions_mut().remove::<RequestContext>() else {
        return ApiError::unauthorized("Authentication required before query translation").into_response();
    };

    let method = request.method().clone();
    let raw_query = request.uri().query().map(str::to_owned);

    let context = match pipeline::translate(&config, context, &method, raw_query.as_deref()) {
        Ok(context) => context,
        Err(err) => {
            tracing::warn!("Rejected query for {} {}: {}", method, request.uri().path(), err);
            return ApiError::from(err).into_response();
        }
    };

    if config.debug_logging() {
        if let Some(query) = context.query() {
            match serde_json::to_string(query) {
                Ok(text) => tracing::debug!("Translated query for {} {}: {}", method, request.uri().path(), text),
                Err(e) => tracing::debug!("Translated query could not be rendered: {}", e),
            }
        }
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}
