//! Acting-user context threaded explicitly through record operations.

use serde::Deserialize;

/// Per-call context supplied by the host request layer.
///
/// Only delete attribution reads it. An empty context is valid and stands
/// for anonymous or system-initiated operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    acting_user: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for `name`; a blank name is treated as anonymous.
    pub fn acting_as(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        Self {
            acting_user: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    /// Builds a context from decoded token claims (`UserInfo.name`).
    pub fn from_claims(claims: &TokenClaims) -> Self {
        claims
            .user_info
            .as_ref()
            .and_then(|info| info.name.as_deref())
            .map_or_else(Self::anonymous, |name| Self::acting_as(name))
    }

    pub fn acting_user(&self) -> Option<&str> {
        self.acting_user.as_deref()
    }
}

/// Subset of decoded auth token claims read by the record layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "UserInfo", default)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub name: Option<String>,
}
