use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::error::ApiError;
use crate::handlers::{public, registry, resource, Resource, ResourceState};
use crate::middleware::{protect, RouteConfig};

/// Full application router built from the process configuration.
pub fn build_app(config: &AppConfig, store: Arc<dyn DocumentStore>) -> Router {
    let route_config = RouteConfig::from_app_config(config);
    let mut app = router(route_config, store, config.filter.max_limit)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(&config.security.cors_origins));

    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

/// Public routes plus every registered resource behind the request pipeline.
pub fn router(route_config: RouteConfig, store: Arc<dyn DocumentStore>, max_limit: Option<u64>) -> Router {
    let public_routes = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .with_state(store.clone());

    registry()
        .into_iter()
        .fold(public_routes, |app, resource| {
            app.merge(resource_routes(resource, &route_config, store.clone(), max_limit))
        })
}

fn resource_routes(
    resource: Resource,
    route_config: &RouteConfig,
    store: Arc<dyn DocumentStore>,
    max_limit: Option<u64>,
) -> Router {
    let path = resource.path();
    let config = route_config
        .clone()
        .with_option_keywords(resource.option_keywords.clone());
    let state = ResourceState::new(store, resource, max_limit);

    let routes = Router::new()
        .route(&path, get(resource::list).post(resource::create))
        .route(&format!("{}/user", path), get(resource::list))
        .route(
            &format!("{}/user/:id", path),
            put(resource::update).patch(resource::update),
        )
        .route(
            &format!("{}/:id", path),
            get(resource::show)
                .put(resource::update)
                .patch(resource::update)
                .delete(resource::delete),
        )
        .with_state(state);

    protect(routes, config)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Request handler panicked: {}", detail);

    ApiError::internal_server_error("Internal server error").into_response()
}
