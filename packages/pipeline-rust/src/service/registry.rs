//! Per-request-type declaration registries, populated at startup.
//!
//! Both registries are keyed by the request's `TypeId` and read concurrently
//! while requests are in flight.

use std::any::{Any, TypeId};
use std::sync::Arc;

use conduit_core::AccessRequirement;
use dashmap::DashMap;

use crate::traits::{Request, Validator};

// ---------------------------------------------------------------------------
// AccessRegistry
// ---------------------------------------------------------------------------

/// Access requirements declared for each request type.
#[derive(Debug, Default)]
pub struct AccessRegistry {
    by_type: DashMap<TypeId, Arc<[AccessRequirement]>>,
}

impl AccessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a requirement for `R`. Multiple requirements combine: an anonymous
    /// caller fails all of them, role lists are OR-ed together.
    pub fn require<R: Request>(&self, requirement: AccessRequirement) {
        let mut entry = self
            .by_type
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Arc::from(Vec::new()));
        let mut requirements = entry.to_vec();
        requirements.push(requirement);
        *entry = Arc::from(requirements);
    }

    /// Requirements for `R`; empty when `R` is unrestricted.
    #[must_use]
    pub fn requirements_for<R: Request>(&self) -> Arc<[AccessRequirement]> {
        self.by_type
            .get(&TypeId::of::<R>())
            .map_or_else(|| Arc::from(Vec::new()), |entry| Arc::clone(entry.value()))
    }
}

// ---------------------------------------------------------------------------
// ValidatorRegistry
// ---------------------------------------------------------------------------

/// Validators registered for each request type, in registration order.
///
/// Each entry holds a `Vec<Arc<dyn Validator<R>>>` erased behind `Any`.
#[derive(Default)]
pub struct ValidatorRegistry {
    by_type: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R, V>(&self, validator: V)
    where
        R: Request,
        V: Validator<R>,
    {
        let mut entry = self
            .by_type
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<Arc<dyn Validator<R>>>::new()));
        if let Some(list) = entry.downcast_mut::<Vec<Arc<dyn Validator<R>>>>() {
            list.push(Arc::new(validator));
        }
    }

    /// Validators for `R` in registration order.
    #[must_use]
    pub fn validators_for<R: Request>(&self) -> Vec<Arc<dyn Validator<R>>> {
        self.by_type
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.value().downcast_ref::<Vec<Arc<dyn Validator<R>>>>().cloned())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count_for<R: Request>(&self) -> usize {
        self.validators_for::<R>().len()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("request_types", &self.by_type.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
