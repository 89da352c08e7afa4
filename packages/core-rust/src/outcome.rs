//! Result model returned by every handler.
//!
//! Two shapes share one vocabulary of kinds ([`Status`]):
//!
//! - [`Outcome`] is the flat shape and never carries a value.
//! - [`ValueOutcome<T>`] carries a `T` on its success kinds (`Ok`, `Created`).
//!
//! Exactly one kind is active per value. Business failures are always
//! expressed as one of these kinds and returned, never raised.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationFailure;

/// Discriminant shared by both result shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Created,
    NoContent,
    NotFound,
    Unauthorized,
    Forbidden,
    Invalid,
    Error,
    Conflict,
    Unavailable,
    CriticalError,
}

impl Status {
    /// `true` for `Ok`, `Created` and `NoContent`.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created | Self::NoContent)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Created => "created",
            Self::NoContent => "no_content",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Invalid => "invalid",
            Self::Error => "error",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
            Self::CriticalError => "critical_error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat result shape: a kind with no success value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Created {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    NoContent,
    NotFound { errors: Vec<String> },
    Unauthorized,
    Forbidden,
    Invalid { failures: Vec<ValidationFailure> },
    Error { errors: Vec<String> },
    Conflict { errors: Vec<String> },
    Unavailable { errors: Vec<String> },
    CriticalError { errors: Vec<String> },
}

/// Value-carrying result shape, generic over the success value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValueOutcome<T> {
    Ok {
        value: T,
    },
    Created {
        value: T,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    NoContent,
    NotFound { errors: Vec<String> },
    Unauthorized,
    Forbidden,
    Invalid { failures: Vec<ValidationFailure> },
    Error { errors: Vec<String> },
    Conflict { errors: Vec<String> },
    Unavailable { errors: Vec<String> },
    CriticalError { errors: Vec<String> },
}

/// Constructors and accessors for the kinds both shapes have in common.
macro_rules! shared_kinds {
    ($name:ident $(<$t:ident>)?) => {
        impl$(<$t>)? $name$(<$t>)? {
            #[must_use]
            pub fn no_content() -> Self {
                Self::NoContent
            }

            pub fn not_found<I, S>(errors: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self::NotFound { errors: errors.into_iter().map(Into::into).collect() }
            }

            #[must_use]
            pub fn unauthorized() -> Self {
                Self::Unauthorized
            }

            #[must_use]
            pub fn forbidden() -> Self {
                Self::Forbidden
            }

            /// Invalid result carrying the reported failures. Callers pass at
            /// least one failure; an empty list is accepted but meaningless.
            pub fn invalid(failures: impl IntoIterator<Item = ValidationFailure>) -> Self {
                Self::Invalid { failures: failures.into_iter().collect() }
            }

            pub fn error<I, S>(errors: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self::Error { errors: errors.into_iter().map(Into::into).collect() }
            }

            pub fn conflict<I, S>(errors: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self::Conflict { errors: errors.into_iter().map(Into::into).collect() }
            }

            pub fn unavailable<I, S>(errors: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self::Unavailable { errors: errors.into_iter().map(Into::into).collect() }
            }

            pub fn critical_error<I, S>(errors: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self::CriticalError { errors: errors.into_iter().map(Into::into).collect() }
            }

            /// The active kind.
            #[must_use]
            pub fn status(&self) -> Status {
                match self {
                    Self::Ok { .. } => Status::Ok,
                    Self::Created { .. } => Status::Created,
                    Self::NoContent => Status::NoContent,
                    Self::NotFound { .. } => Status::NotFound,
                    Self::Unauthorized => Status::Unauthorized,
                    Self::Forbidden => Status::Forbidden,
                    Self::Invalid { .. } => Status::Invalid,
                    Self::Error { .. } => Status::Error,
                    Self::Conflict { .. } => Status::Conflict,
                    Self::Unavailable { .. } => Status::Unavailable,
                    Self::CriticalError { .. } => Status::CriticalError,
                }
            }

            #[must_use]
            pub fn is_success(&self) -> bool {
                self.status().is_success()
            }

            /// Validation failures of an `Invalid` result; empty for every other kind.
            #[must_use]
            pub fn validation_failures(&self) -> &[ValidationFailure] {
                match self {
                    Self::Invalid { failures } => failures,
                    _ => &[],
                }
            }

            /// Error messages attached to an error-like kind; empty otherwise.
            #[must_use]
            pub fn errors(&self) -> &[String] {
                match self {
                    Self::NotFound { errors }
                    | Self::Error { errors }
                    | Self::Conflict { errors }
                    | Self::Unavailable { errors }
                    | Self::CriticalError { errors } => errors,
                    _ => &[],
                }
            }
        }
    };
}

shared_kinds!(Outcome);
shared_kinds!(ValueOutcome<T>);

impl Outcome {
    #[must_use]
    pub fn success() -> Self {
        Self::Ok
    }

    #[must_use]
    pub fn created(location: Option<String>) -> Self {
        Self::Created { location }
    }
}

impl<T> ValueOutcome<T> {
    pub fn success(value: T) -> Self {
        Self::Ok { value }
    }

    pub fn created(value: T, location: Option<String>) -> Self {
        Self::Created { value, location }
    }

    /// Borrows the success value, if this is `Ok` or `Created`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok { value } | Self::Created { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ok { value } | Self::Created { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Transforms the success value, keeping every other kind as is.
    pub fn map<U, F>(self, f: F) -> ValueOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Ok { value } => ValueOutcome::Ok { value: f(value) },
            Self::Created { value, location } => ValueOutcome::Created {
                value: f(value),
                location,
            },
            Self::NoContent => ValueOutcome::NoContent,
            Self::NotFound { errors } => ValueOutcome::NotFound { errors },
            Self::Unauthorized => ValueOutcome::Unauthorized,
            Self::Forbidden => ValueOutcome::Forbidden,
            Self::Invalid { failures } => ValueOutcome::Invalid { failures },
            Self::Error { errors } => ValueOutcome::Error { errors },
            Self::Conflict { errors } => ValueOutcome::Conflict { errors },
            Self::Unavailable { errors } => ValueOutcome::Unavailable { errors },
            Self::CriticalError { errors } => ValueOutcome::CriticalError { errors },
        }
    }

    /// Drops the success value and keeps the kind.
    pub fn into_outcome(self) -> Outcome {
        match self {
            Self::Ok { .. } => Outcome::Ok,
            Self::Created { location, .. } => Outcome::Created { location },
            Self::NoContent => Outcome::NoContent,
            Self::NotFound { errors } => Outcome::NotFound { errors },
            Self::Unauthorized => Outcome::Unauthorized,
            Self::Forbidden => Outcome::Forbidden,
            Self::Invalid { failures } => Outcome::Invalid { failures },
            Self::Error { errors } => Outcome::Error { errors },
            Self::Conflict { errors } => Outcome::Conflict { errors },
            Self::Unavailable { errors } => Outcome::Unavailable { errors },
            Self::CriticalError { errors } => Outcome::CriticalError { errors },
        }
    }
}

impl<T> From<ValueOutcome<T>> for Outcome {
    fn from(outcome: ValueOutcome<T>) -> Self {
        outcome.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_kinds_report_success() {
        assert!(Outcome::success().is_success());
        assert!(Outcome::created(None).is_success());
        assert!(Outcome::no_content().is_success());
        assert!(!Outcome::forbidden().is_success());
        assert!(!Outcome::error(["boom"]).is_success());
    }

    #[test]
    fn status_matches_active_kind() {
        assert_eq!(Outcome::unauthorized().status(), Status::Unauthorized);
        assert_eq!(
            ValueOutcome::<u32>::critical_error(["disk"]).status(),
            Status::CriticalError
        );
        assert_eq!(ValueOutcome::success(7).status(), Status::Ok);
        assert_eq!(
            ValueOutcome::created(7, Some("/items/7".into())).status(),
            Status::Created
        );
    }

    #[test]
    fn value_present_only_on_success_kinds() {
        assert_eq!(ValueOutcome::success(3).value(), Some(&3));
        assert_eq!(ValueOutcome::created(4, None).into_value(), Some(4));
        assert_eq!(ValueOutcome::<i32>::not_found(["missing"]).value(), None);
    }

    #[test]
    fn map_keeps_failure_kinds() {
        let failed: ValueOutcome<i32> = ValueOutcome::conflict(["dup"]);
        let mapped = failed.map(|v| v.to_string());
        assert_eq!(mapped, ValueOutcome::<String>::conflict(["dup"]));

        let ok = ValueOutcome::success(2).map(|v| v * 10);
        assert_eq!(ok.into_value(), Some(20));
    }

    #[test]
    fn into_outcome_drops_value_but_keeps_location() {
        let created = ValueOutcome::created("x", Some("/x".to_string()));
        assert_eq!(
            Outcome::from(created),
            Outcome::Created {
                location: Some("/x".to_string())
            }
        );
    }

    #[test]
    fn accessors_expose_attached_details() {
        let invalid = Outcome::invalid([ValidationFailure::new("Email", "must not be empty")]);
        assert_eq!(invalid.validation_failures().len(), 1);
        assert!(invalid.errors().is_empty());

        let unavailable = Outcome::unavailable(["maintenance"]);
        assert_eq!(unavailable.errors(), ["maintenance".to_string()]);
        assert!(unavailable.validation_failures().is_empty());
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(ValueOutcome::success(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ok", "value": 5 }));

        let json = serde_json::to_value(Outcome::forbidden()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "forbidden" }));

        let back: Outcome =
            serde_json::from_value(serde_json::json!({ "status": "not_found", "errors": ["gone"] }))
                .unwrap();
        assert_eq!(back, Outcome::not_found(["gone"]));
    }
}
