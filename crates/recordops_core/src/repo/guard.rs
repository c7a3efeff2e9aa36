//! Delete guard: decides whether a record may be soft-deleted.

use crate::model::relationship::ChildRelationship;
use crate::repo::datastore::Datastore;
use crate::repo::error::RepoResult;

/// Outcome of [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteDecision {
    Allow,
    /// Type names of every non-empty relationship, in declaration order.
    Deny { blocking: Vec<&'static str> },
}

impl DeleteDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Allows deletion only when every relationship has no active child.
///
/// Issues one existence probe per relationship and never loads the
/// collections themselves. Every relationship is probed so a denial can
/// name all blockers at once.
pub fn check<S: Datastore>(
    relationships: &[ChildRelationship],
    store: &S,
) -> RepoResult<DeleteDecision> {
    let mut blocking = Vec::new();
    for relationship in relationships {
        if store.exists(relationship)? {
            blocking.push(relationship.type_name());
        }
    }

    if blocking.is_empty() {
        Ok(DeleteDecision::Allow)
    } else {
        Ok(DeleteDecision::Deny { blocking })
    }
}
