//! Dynamic result factory.
//!
//! Gating behaviors are written once, generic over every response type, yet a
//! short-circuit must hand back a failure value of the exact type the call
//! site expects. Response types register a constructor set keyed by `TypeId`
//! once at startup; [`ResultFactory::build`] looks the set up at runtime and
//! produces the value.
//!
//! Two distinct configuration faults can surface:
//!
//! - [`FactoryError::UnsupportedResponse`]: the response type was never
//!   registered, so it is neither [`Outcome`] nor a [`ValueOutcome<T>`] known
//!   to the factory.
//! - [`FactoryError::MissingConstructor`] / [`FactoryError::ConstructorMismatch`]:
//!   the type is known but the requested constructor is absent, or produced a
//!   value of another type.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::outcome::{Outcome, Status, ValueOutcome};
use crate::validation::ValidationFailure;

// ---------------------------------------------------------------------------
// Shape and descriptor
// ---------------------------------------------------------------------------

/// Which of the two result shapes a response type has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// [`Outcome`]: no success value.
    Flat,
    /// [`ValueOutcome<T>`], closed over the named value type.
    Valued { value_type: &'static str },
}

/// Runtime description of a registered response type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub shape: Shape,
}

impl ResponseDescriptor {
    #[must_use]
    pub fn of<R: FailureResponse>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            shape: R::shape(),
        }
    }
}

// ---------------------------------------------------------------------------
// FailureResponse capability
// ---------------------------------------------------------------------------

/// Failure constructors a response type exposes to gating behaviors.
pub trait FailureResponse: Sized + Send + 'static {
    fn shape() -> Shape;

    fn invalid(failures: Vec<ValidationFailure>) -> Self;

    fn forbidden() -> Self;

    fn unauthorized() -> Self;
}

impl FailureResponse for Outcome {
    fn shape() -> Shape {
        Shape::Flat
    }

    fn invalid(failures: Vec<ValidationFailure>) -> Self {
        Outcome::Invalid { failures }
    }

    fn forbidden() -> Self {
        Outcome::Forbidden
    }

    fn unauthorized() -> Self {
        Outcome::Unauthorized
    }
}

impl<T: Send + 'static> FailureResponse for ValueOutcome<T> {
    fn shape() -> Shape {
        Shape::Valued {
            value_type: type_name::<T>(),
        }
    }

    fn invalid(failures: Vec<ValidationFailure>) -> Self {
        ValueOutcome::Invalid { failures }
    }

    fn forbidden() -> Self {
        ValueOutcome::Forbidden
    }

    fn unauthorized() -> Self {
        ValueOutcome::Unauthorized
    }
}

// ---------------------------------------------------------------------------
// Failure request and errors
// ---------------------------------------------------------------------------

/// The failure a gating behavior wants to short-circuit with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Invalid(Vec<ValidationFailure>),
    Forbidden,
    Unauthorized,
}

impl Failure {
    /// Name of the constructor that produces this failure.
    #[must_use]
    pub fn constructor(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Invalid(_) => Status::Invalid,
            Self::Forbidden => Status::Forbidden,
            Self::Unauthorized => Status::Unauthorized,
        }
    }
}

/// Configuration faults raised when a failure value cannot be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error(
        "response type `{type_name}` is not a registered result shape; \
         gated requests must answer with `Outcome` or `ValueOutcome<T>`"
    )]
    UnsupportedResponse { type_name: &'static str },
    #[error("response type `{type_name}` has no `{constructor}` constructor")]
    MissingConstructor {
        type_name: &'static str,
        constructor: &'static str,
    },
    #[error("`{constructor}` constructor registered for `{type_name}` produced a value of another type")]
    ConstructorMismatch {
        type_name: &'static str,
        constructor: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// A possibly partial set of failure constructors for response type `R`.
pub struct Constructors<R> {
    invalid: Option<fn(Vec<ValidationFailure>) -> R>,
    forbidden: Option<fn() -> R>,
    unauthorized: Option<fn() -> R>,
}

impl<R> Constructors<R> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            invalid: None,
            forbidden: None,
            unauthorized: None,
        }
    }

    #[must_use]
    pub fn with_invalid(mut self, f: fn(Vec<ValidationFailure>) -> R) -> Self {
        self.invalid = Some(f);
        self
    }

    #[must_use]
    pub fn with_forbidden(mut self, f: fn() -> R) -> Self {
        self.forbidden = Some(f);
        self
    }

    #[must_use]
    pub fn with_unauthorized(mut self, f: fn() -> R) -> Self {
        self.unauthorized = Some(f);
        self
    }
}

impl<R: FailureResponse> Constructors<R> {
    /// Every constructor, taken from the [`FailureResponse`] impl.
    #[must_use]
    pub fn full() -> Self {
        Self {
            invalid: Some(R::invalid),
            forbidden: Some(R::forbidden),
            unauthorized: Some(R::unauthorized),
        }
    }
}

impl<R> fmt::Debug for Constructors<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructors")
            .field("invalid", &self.invalid.is_some())
            .field("forbidden", &self.forbidden.is_some())
            .field("unauthorized", &self.unauthorized.is_some())
            .finish()
    }
}

type ErasedValue = Box<dyn Any + Send>;
type ErasedInvalid = Box<dyn Fn(Vec<ValidationFailure>) -> ErasedValue + Send + Sync>;
type ErasedNullary = Box<dyn Fn() -> ErasedValue + Send + Sync>;

/// Type-erased constructor set stored in the registry.
struct ErasedConstructors {
    descriptor: ResponseDescriptor,
    invalid: Option<ErasedInvalid>,
    forbidden: Option<ErasedNullary>,
    unauthorized: Option<ErasedNullary>,
}

impl ErasedConstructors {
    fn erase<R: Send + 'static>(descriptor: ResponseDescriptor, ctors: Constructors<R>) -> Self {
        Self {
            descriptor,
            invalid: ctors
                .invalid
                .map(|f| {
                    Box::new(move |failures: Vec<ValidationFailure>| Box::new(f(failures)) as ErasedValue)
                        as ErasedInvalid
                }),
            forbidden: ctors
                .forbidden
                .map(|f| Box::new(move || Box::new(f()) as ErasedValue) as ErasedNullary),
            unauthorized: ctors
                .unauthorized
                .map(|f| Box::new(move || Box::new(f()) as ErasedValue) as ErasedNullary),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultFactory
// ---------------------------------------------------------------------------

/// Registry of failure constructors keyed by response `TypeId`.
///
/// Lookups take no exclusive lock, so overlapping requests of different types
/// can build failures concurrently.
pub struct ResultFactory {
    entries: DashMap<TypeId, Arc<ErasedConstructors>>,
}

impl ResultFactory {
    /// Creates a factory with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Creates a factory with the flat [`Outcome`] shape registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let factory = Self::new();
        factory.register::<Outcome>();
        factory
    }

    /// Registers the full constructor set of a result shape. Registering the
    /// same type twice is a no-op.
    pub fn register<R: FailureResponse>(&self) {
        if self.entries.contains_key(&TypeId::of::<R>()) {
            return;
        }
        let descriptor = ResponseDescriptor::of::<R>();
        self.insert(ErasedConstructors::erase(descriptor, Constructors::<R>::full()));
    }

    /// Registers a hand-written, possibly partial, constructor set for an
    /// arbitrary response type. Replaces any earlier registration.
    pub fn register_constructors<R: Send + 'static>(&self, shape: Shape, ctors: Constructors<R>) {
        let descriptor = ResponseDescriptor {
            type_id: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            shape,
        };
        self.insert(ErasedConstructors::erase(descriptor, ctors));
    }

    fn insert(&self, entry: ErasedConstructors) {
        tracing::debug!(
            response = entry.descriptor.type_name,
            shape = ?entry.descriptor.shape,
            "registered result constructors"
        );
        self.entries.insert(entry.descriptor.type_id, Arc::new(entry));
    }

    #[must_use]
    pub fn is_registered<R: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<R>())
    }

    /// Descriptor of a registered response type.
    #[must_use]
    pub fn describe<R: 'static>(&self) -> Option<ResponseDescriptor> {
        self.entries
            .get(&TypeId::of::<R>())
            .map(|entry| entry.value().descriptor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Produces a value of exactly `R` representing `failure`.
    ///
    /// # Errors
    ///
    /// - [`FactoryError::UnsupportedResponse`] if `R` was never registered
    /// - [`FactoryError::MissingConstructor`] if `R` lacks the constructor
    /// - [`FactoryError::ConstructorMismatch`] if the constructor yields another type
    pub fn build<R: Any + Send>(&self, failure: Failure) -> Result<R, FactoryError> {
        let type_name = type_name::<R>();
        let entry = self
            .entries
            .get(&TypeId::of::<R>())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(FactoryError::UnsupportedResponse { type_name })?;

        let constructor = failure.constructor();
        let value = match failure {
            Failure::Invalid(failures) => entry.invalid.as_ref().map(|f| f(failures)),
            Failure::Forbidden => entry.forbidden.as_ref().map(|f| f()),
            Failure::Unauthorized => entry.unauthorized.as_ref().map(|f| f()),
        }
        .ok_or(FactoryError::MissingConstructor {
            type_name,
            constructor,
        })?;

        value
            .downcast::<R>()
            .map(|boxed| *boxed)
            .map_err(|_| FactoryError::ConstructorMismatch {
                type_name,
                constructor,
            })
    }

    /// # Errors
    ///
    /// See [`ResultFactory::build`].
    pub fn invalid<R: Any + Send>(&self, failures: Vec<ValidationFailure>) -> Result<R, FactoryError> {
        self.build(Failure::Invalid(failures))
    }

    /// # Errors
    ///
    /// See [`ResultFactory::build`].
    pub fn forbidden<R: Any + Send>(&self) -> Result<R, FactoryError> {
        self.build(Failure::Forbidden)
    }

    /// # Errors
    ///
    /// See [`ResultFactory::build`].
    pub fn unauthorized<R: Any + Send>(&self) -> Result<R, FactoryError> {
        self.build(Failure::Unauthorized)
    }
}

impl Default for ResultFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ResultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self
            .entries
            .iter()
            .map(|entry| entry.value().descriptor.type_name)
            .collect();
        f.debug_struct("ResultFactory").field("responses", &names).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct User {
        name: String,
    }

    /// A response type outside the two built-in shapes.
    #[derive(Debug, PartialEq)]
    enum Reply {
        Denied,
    }

    #[test]
    fn builds_flat_failures() {
        let factory = ResultFactory::with_defaults();
        let forbidden: Outcome = factory.forbidden().unwrap();
        assert_eq!(forbidden, Outcome::Forbidden);

        let unauthorized: Outcome = factory.unauthorized().unwrap();
        assert_eq!(unauthorized.status(), Status::Unauthorized);
    }

    #[test]
    fn builds_valued_failures_for_exact_closed_type() {
        let factory = ResultFactory::new();
        factory.register::<ValueOutcome<User>>();

        let failures = vec![ValidationFailure::new("Email", "must not be empty")];
        let invalid: ValueOutcome<User> = factory.invalid(failures.clone()).unwrap();
        assert_eq!(invalid.validation_failures(), failures.as_slice());
    }

    #[test]
    fn describe_reports_shape() {
        let factory = ResultFactory::with_defaults();
        factory.register::<ValueOutcome<u64>>();

        assert_eq!(factory.describe::<Outcome>().unwrap().shape, Shape::Flat);
        assert_eq!(
            factory.describe::<ValueOutcome<u64>>().unwrap().shape,
            Shape::Valued { value_type: "u64" }
        );
        assert!(factory.describe::<ValueOutcome<i8>>().is_none());
    }

    #[test]
    fn closed_types_are_distinct() {
        let factory = ResultFactory::new();
        factory.register::<ValueOutcome<u32>>();

        assert!(factory.forbidden::<ValueOutcome<u32>>().is_ok());
        let err = factory.forbidden::<ValueOutcome<i32>>().unwrap_err();
        assert!(matches!(err, FactoryError::UnsupportedResponse { .. }));
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let factory = ResultFactory::with_defaults();
        let err = factory.unauthorized::<String>().unwrap_err();
        assert_eq!(
            err,
            FactoryError::UnsupportedResponse {
                type_name: type_name::<String>()
            }
        );
    }

    #[test]
    fn partial_constructor_set_reports_missing_constructor() {
        let factory = ResultFactory::new();
        factory.register_constructors(
            Shape::Flat,
            Constructors::<Reply>::empty().with_forbidden(|| Reply::Denied),
        );

        assert_eq!(factory.forbidden::<Reply>().unwrap(), Reply::Denied);
        let err = factory.invalid::<Reply>(vec![]).unwrap_err();
        assert_eq!(
            err,
            FactoryError::MissingConstructor {
                type_name: type_name::<Reply>(),
                constructor: "invalid",
            }
        );
    }

    #[test]
    fn mismatched_constructor_is_distinct_from_unsupported() {
        let factory = ResultFactory::new();
        // Constructors for `Outcome` filed under the `Reply` type id.
        let mut erased = ErasedConstructors::erase(
            ResponseDescriptor::of::<Outcome>(),
            Constructors::<Outcome>::full(),
        );
        erased.descriptor.type_id = TypeId::of::<Reply>();
        factory.insert(erased);

        let err = factory.forbidden::<Reply>().unwrap_err();
        assert!(matches!(
            err,
            FactoryError::ConstructorMismatch {
                constructor: "forbidden",
                ..
            }
        ));
    }

    #[test]
    fn register_is_idempotent() {
        let factory = ResultFactory::with_defaults();
        factory.register::<Outcome>();
        factory.register::<Outcome>();
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn concurrent_readers_share_the_registry() {
        let factory = Arc::new(ResultFactory::with_defaults());
        factory.register::<ValueOutcome<String>>();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let factory = Arc::clone(&factory);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        factory.forbidden::<Outcome>().unwrap().status()
                    } else {
                        factory.forbidden::<ValueOutcome<String>>().unwrap().status()
                    }
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Status::Forbidden);
        }
    }

    #[test]
    fn failure_reports_constructor_and_status() {
        assert_eq!(Failure::Forbidden.constructor(), "forbidden");
        assert_eq!(Failure::Invalid(vec![]).status(), Status::Invalid);
    }
}
