use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::pipeline::{self, RouteConfig};
use crate::auth::AuthError;
use crate::error::ApiError;

/// `Set-Cookie` value that expires the refresh cookie on the client
pub fn clear_refresh_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        name
    )
}

/// Authentication failure response; the refresh cookie is cleared alongside
fn auth_failure(config: &RouteConfig, err: AuthError) -> Response {
    let mut response = ApiError::from(err).into_response();
    match HeaderValue::from_str(&clear_refresh_cookie(config.refresh_cookie_name())) {
        Ok(cookie) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        Err(e) => tracing::warn!("Refresh cookie name is not a valid header value: {}", e),
    }
    response
}

/// Validates the bearer token and seeds the request context with the caller's identity
pub async fn jwt_auth_middleware(
    State(config): State<RouteConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let context = match pipeline::authenticate(&config, authorization) {
        Ok(context) => context,
        Err(err) => {
            tracing::warn!("Authentication failed for {} {}: {}", request.method(), request.uri().path(), err);
            return auth_failure(&config, err);
        }
    };

    tracing::debug!(
        "Authenticated '{}' (session {}) for {} {}",
        context.identity().username,
        context.identity().session_id,
        request.method(),
        request.uri().path()
    );

    request.extensions_mut().insert(context);
    next.run(request).await
}
