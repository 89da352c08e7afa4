use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

/// The principal on whose behalf a request is processed.
///
/// Supplied by the host for the duration of one request. An identity without
/// an identifier is anonymous.
pub trait Identity: Send + Sync {
    /// Unique identifier of the principal; `None` for anonymous callers.
    fn id(&self) -> Option<Uuid>;

    /// Whether the principal is a member of `role`.
    fn is_in_role(&self, role: &str) -> bool;

    fn is_authenticated(&self) -> bool {
        self.id().is_some()
    }
}

/// Source of the ambient identity for the request being processed.
pub trait IdentityProvider: Send + Sync {
    /// Resolves the current identity. An error means the provider itself is
    /// broken, which is distinct from resolving to an anonymous identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be determined.
    fn current(&self) -> anyhow::Result<Arc<dyn Identity>>;
}

impl IdentityProvider for Arc<dyn Identity> {
    fn current(&self) -> anyhow::Result<Arc<dyn Identity>> {
        Ok(Arc::clone(self))
    }
}

/// An unauthenticated caller with no roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Identity for Anonymous {
    fn id(&self) -> Option<Uuid> {
        None
    }

    fn is_in_role(&self, _role: &str) -> bool {
        false
    }
}

/// An authenticated caller with a fixed role set. Role names compare exactly.
#[derive(Debug, Clone)]
pub struct Principal {
    id: Uuid,
    roles: HashSet<String>,
}

impl Principal {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            roles: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl Identity for Principal {
    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
