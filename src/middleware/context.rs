use crate::auth::{AccessDecision, Identity};
use crate::filter::ParsedQuery;

/// Per-request state handed from one pipeline stage to the next.
///
/// Each stage consumes the context it received and produces a new one; the
/// resource handler reads the final value from the request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    identity: Identity,
    decision: Option<AccessDecision>,
    query: Option<ParsedQuery>,
}

impl RequestContext {
    pub fn authenticated(identity: Identity) -> Self {
        Self { identity, decision: None, query: None }
    }

    pub fn with_decision(self, decision: AccessDecision) -> Self {
        Self { decision: Some(decision), ..self }
    }

    /// Attach the translated query, layering any constraints the access decision forced.
    pub fn with_query(self, query: ParsedQuery) -> Self {
        let query = match &self.decision {
            Some(decision) => query.with_filter_additions(&decision.forced_filter_additions),
            None => query,
        };
        Self { query: Some(query), ..self }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[cfg(test)]
    pub(crate) fn decision(&self) -> Option<&AccessDecision> {
        self.decision.as_ref()
    }

    pub fn query(&self) -> Option<&ParsedQuery> {
        self.query.as_ref()
    }

    /// True when the request came through the self-service branch.
    pub fn is_self_service(&self) -> bool {
        self.decision
            .as_ref()
            .is_some_and(|decision| !decision.forced_filter_additions.is_empty())
    }
}
