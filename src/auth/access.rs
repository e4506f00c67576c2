//! Coarse method + path-shape authorization.
//!
//! The decision never touches storage. Checks that need the loaded document
//! (who owns it) go through an [`OwnershipPredicate`] supplied by the
//! resource, after the pipeline has already let the request through.

use std::fmt;

use axum::http::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Identity, Role};
use crate::database::Document;

/// Document field holding the id of the identity that created it
pub const OWNER_FIELD: &str = "ownerId";

/// Path segment marking self-service routes
const SELF_SERVICE_SEGMENT: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DenyReason {
    InsufficientRole,
    MethodNotAllowed,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::InsufficientRole => write!(f, "insufficient role"),
            DenyReason::MethodNotAllowed => write!(f, "method not allowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub allow: bool,
    pub reason: Option<DenyReason>,
    /// Constraints the pipeline layers onto the translated filter
    pub forced_filter_additions: Map<String, Value>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self { allow: true, reason: None, forced_filter_additions: Map::new() }
    }

    fn allow_own(identity: &Identity) -> Self {
        let mut forced = Map::new();
        forced.insert(OWNER_FIELD.to_string(), Value::String(identity.user_id.clone()));
        Self { allow: true, reason: None, forced_filter_additions: forced }
    }

    fn deny(reason: DenyReason) -> Self {
        Self { allow: false, reason: Some(reason), forced_filter_additions: Map::new() }
    }
}

/// True when one of the path segments is exactly `user`.
pub fn is_self_service(path: &str) -> bool {
    path.split('/').any(|segment| segment == SELF_SERVICE_SEGMENT)
}

/// Decide whether `identity` may issue `method` against `path`.
///
/// DELETE admits `Manager` only; an Admin without the Manager role is denied.
/// Unknown methods fail closed.
pub fn decide(identity: &Identity, method: &Method, path: &str) -> AccessDecision {
    match *method {
        Method::POST => AccessDecision::allow(),
        Method::GET | Method::PUT | Method::PATCH => {
            if is_self_service(path) {
                AccessDecision::allow_own(identity)
            } else if identity.has_any_role(&[Role::Manager, Role::Admin]) {
                AccessDecision::allow()
            } else {
                AccessDecision::deny(DenyReason::InsufficientRole)
            }
        }
        Method::DELETE => {
            if identity.has_role(Role::Manager) {
                AccessDecision::allow()
            } else {
                AccessDecision::deny(DenyReason::InsufficientRole)
            }
        }
        _ => AccessDecision::deny(DenyReason::MethodNotAllowed),
    }
}

/// Document-level check run by a resource after it has loaded the target.
pub trait OwnershipPredicate: Send + Sync {
    fn permits(&self, document: &Document, identity: &Identity) -> bool;
}

/// The owning identity, or any Manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerOrManager;

impl OwnershipPredicate for OwnerOrManager {
    fn permits(&self, document: &Document, identity: &Identity) -> bool {
        if identity.has_role(Role::Manager) {
            return true;
        }
        document
            .get(OWNER_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|owner| owner == identity.user_id)
    }
}

/// Any authenticated identity; used by resources shared across a tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyIdentity;

impl OwnershipPredicate for AnyIdentity {
    fn permits(&self, _document: &Document, _identity: &Identity) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn identity(roles: &[Role]) -> Identity {
        Identity {
            user_id: "u-1".to_string(),
            username: "tester".to_string(),
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            session_id: "s-1".to_string(),
        }
    }

    #[test]
    fn post_is_open_to_everyone() {
        assert!(decide(&identity(&[Role::Employee]), &Method::POST, "/benefits").allow);
        assert!(decide(&identity(&[]), &Method::POST, "/notes").allow);
    }

    #[test]
    fn read_and_update_table() {
        for method in [Method::GET, Method::PUT, Method::PATCH] {
            assert!(decide(&identity(&[Role::Employee]), &method, "/benefits/user").allow);
            assert!(!decide(&identity(&[Role::Employee]), &method, "/benefits/1").allow);
            assert!(decide(&identity(&[Role::Manager]), &method, "/benefits/1").allow);
            assert!(decide(&identity(&[Role::Admin]), &method, "/benefits/1").allow);
        }
    }

    #[test]
    fn denial_carries_reason() {
        let decision = decide(&identity(&[Role::Employee]), &Method::GET, "/benefits/1");
        assert_eq!(decision.reason, Some(DenyReason::InsufficientRole));
        assert!(decision.forced_filter_additions.is_empty());
    }

    #[test]
    fn self_service_forces_ownership() {
        let decision = decide(&identity(&[Role::Employee]), &Method::GET, "/survey-builder/user");
        assert!(decision.allow);
        assert_eq!(decision.forced_filter_additions.get(OWNER_FIELD), Some(&json!("u-1")));
    }

    #[test]
    fn self_service_matches_whole_segments_only() {
        assert!(is_self_service("/leave-request/user/42"));
        assert!(!is_self_service("/users"));
        assert!(!is_self_service("/user-settings"));
    }

    // Current behavior: DELETE requires Manager, Admin alone is not enough.
    #[test]
    fn delete_requires_manager_even_for_admin() {
        assert!(!decide(&identity(&[Role::Admin]), &Method::DELETE, "/benefits/1").allow);
        assert!(decide(&identity(&[Role::Manager]), &Method::DELETE, "/benefits/1").allow);
        assert!(decide(&identity(&[Role::Admin, Role::Manager]), &Method::DELETE, "/benefits/1").allow);
        assert!(!decide(&identity(&[Role::Employee]), &Method::DELETE, "/benefits/user").allow);
    }

    #[test]
    fn other_methods_fail_closed() {
        let decision = decide(&identity(&[Role::Admin, Role::Manager]), &Method::OPTIONS, "/benefits");
        assert!(!decision.allow);
        assert_eq!(decision.reason, Some(DenyReason::MethodNotAllowed));
        assert!(!decide(&identity(&[Role::Manager]), &Method::HEAD, "/benefits").allow);
    }

    #[test]
    fn owner_or_manager_predicate() {
        let mut document = Document::new();
        document.insert(OWNER_FIELD.to_string(), json!("u-1"));

        assert!(OwnerOrManager.permits(&document, &identity(&[Role::Employee])));

        let stranger = Identity { user_id: "u-2".to_string(), ..identity(&[Role::Employee]) };
        assert!(!OwnerOrManager.permits(&document, &stranger));

        let manager = Identity { user_id: "u-3".to_string(), ..identity(&[Role::Manager]) };
        assert!(OwnerOrManager.permits(&document, &manager));

        assert!(!OwnerOrManager.permits(&Document::new(), &identity(&[Role::Admin])));
    }
}
