pub mod access;
pub mod auth;
pub mod context;
pub mod pipeline;
pub mod query;
pub mod response;

pub use access::verify_roles_middleware;
pub use auth::{clear_refresh_cookie, jwt_auth_middleware};
pub use context::RequestContext;
pub use pipeline::{protect, PipelineError, RouteConfig};
pub use query::query_defaults_middleware;
pub use response::{ApiResponse, ApiResult};
