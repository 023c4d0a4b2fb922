use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};

/// Who is browsing. Built once at the application boundary and handed to
/// every operation that needs the current user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    user_id: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A blank id is treated as no user.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            user_id: (!user_id.trim().is_empty()).then_some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// The current user, or a `Validation` error mentioning `action`.
    pub fn require_user(&self, action: &str) -> CatalogResult<&str> {
        self.user_id()
            .ok_or_else(|| CatalogError::Validation(format!("sign in to {}", action)))
    }
}
