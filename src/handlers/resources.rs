use std::sync::Arc;

use crate::auth::{AnyIdentity, OwnerOrManager, OwnershipPredicate, Role};
use crate::filter::OptionKeywords;

/// A collection exposed through the generic CRUD routes.
#[derive(Clone)]
pub struct Resource {
    /// URL segment, e.g. `leave-request` for `/leave-request`
    pub name: &'static str,
    pub collection: &'static str,
    /// Singular label used in response messages
    pub label: &'static str,
    pub option_keywords: OptionKeywords,
    /// Roles allowed to create documents; `None` means any authenticated caller
    pub create_roles: Option<&'static [Role]>,
    pub ownership: Arc<dyn OwnershipPredicate>,
}

impl Resource {
    fn new(name: &'static str, collection: &'static str, label: &'static str) -> Self {
        Self {
            name,
            collection,
            label,
            option_keywords: OptionKeywords::default(),
            create_roles: None,
            ownership: Arc::new(OwnerOrManager),
        }
    }

    fn shared(mut self) -> Self {
        self.ownership = Arc::new(AnyIdentity);
        self
    }

    fn created_by(mut self, roles: &'static [Role]) -> Self {
        self.create_roles = Some(roles);
        self
    }

    fn with_keyword(mut self, keyword: &str) -> Self {
        self.option_keywords = self.option_keywords.with(keyword);
        self
    }

    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("option_keywords", &self.option_keywords)
            .field("create_roles", &self.create_roles)
            .finish_non_exhaustive()
    }
}

const MANAGERS: &[Role] = &[Role::Manager];

/// Every resource the service mounts.
pub fn registry() -> Vec<Resource> {
    vec![
        Resource::new("products", "products", "Product").shared(),
        Resource::new("benefits", "benefits", "Benefit").shared().created_by(MANAGERS),
        Resource::new("leave-request", "leaverequests", "Leave request"),
        Resource::new("survey-builder", "surveys", "Survey").with_keyword("populate"),
        Resource::new("customers", "customers", "Customer").with_keyword("populate"),
        Resource::new("repair-tickets", "repairtickets", "Repair ticket").with_keyword("populate"),
        Resource::new("comments", "comments", "Comment"),
        Resource::new("notes", "notes", "Note"),
        Resource::new("announcements", "announcements", "Announcement").shared(),
    ]
}
