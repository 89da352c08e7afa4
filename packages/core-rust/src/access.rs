//! Access requirements declared per request type, and the decision rule that
//! combines them against an [`Identity`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// One declared access requirement.
///
/// An entry without roles only demands an authenticated caller. An entry with
/// roles admits members of any of them. Role strings are kept as declared;
/// whitespace is trimmed and blanks dropped when the decision is made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    roles: Vec<String>,
}

impl AccessRequirement {
    /// Requirement satisfied by any authenticated caller.
    #[must_use]
    pub fn authenticated() -> Self {
        Self { roles: Vec::new() }
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-delimited role list such as `"Admin, Manager"`.
    #[must_use]
    pub fn from_csv(roles: &str) -> Self {
        Self::roles(roles.split(','))
    }

    /// Roles exactly as declared.
    #[must_use]
    pub fn declared_roles(&self) -> &[String] {
        &self.roles
    }

    /// Declared roles with surrounding whitespace removed and blanks dropped.
    pub fn effective_roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.trim()).filter(|r| !r.is_empty())
    }

    /// Whether this entry restricts by role, rather than only by authentication.
    #[must_use]
    pub fn names_roles(&self) -> bool {
        self.effective_roles().next().is_some()
    }
}

/// Result of evaluating a request type's requirements against an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Anonymous caller facing at least one requirement.
    Unauthenticated,
    /// Authenticated caller outside every named role.
    Forbidden,
}

/// Decides whether `identity` may proceed past `requirements`.
///
/// - no entries: allowed, even for anonymous callers
/// - anonymous caller with any entry: unauthenticated
/// - only role-less entries: allowed
/// - otherwise allowed iff the caller is in any role named by any entry
pub fn evaluate(requirements: &[AccessRequirement], identity: &dyn Identity) -> AccessDecision {
    if requirements.is_empty() {
        return AccessDecision::Allow;
    }

    if identity.id().is_none() {
        return AccessDecision::Unauthenticated;
    }

    let roles: BTreeSet<&str> = requirements
        .iter()
        .filter(|r| r.names_roles())
        .flat_map(AccessRequirement::effective_roles)
        .collect();

    if roles.is_empty() || roles.iter().any(|role| identity.is_in_role(role)) {
        AccessDecision::Allow
    } else {
        AccessDecision::Forbidden
    }
}
