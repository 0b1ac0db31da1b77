use thiserror::Error;

use crate::ids::EntityKind;

/// A caller supplied an argument that violates an entity invariant.
///
/// Raised synchronously by the operation that detects it and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },

    #[error("invalid date '{0}': expected YYYY-MM-DD with a year between 1900 and 2026")]
    InvalidDate(String),

    #[error("invalid phone number '{0}': expected XXX-XXX-XXXX")]
    InvalidPhoneNumber(String),

    #[error("a family group needs at least one member")]
    EmptyFamilyGroup,

    #[error("person {0} is not a member of this family group")]
    NotAMember(i64),

    #[error("person {0} is not an occupant of this location")]
    NotAnOccupant(i64),

    #[error("supply {0} is not in this location's inventory")]
    NotInInventory(i64),

    #[error("supply {0} is a personal belonging and cannot be held or allocated by a location")]
    PersonalBelonging(i64),

    #[error("person {0} is not a disaster victim")]
    NotAVictim(i64),

    #[error("supply {0} is already held elsewhere")]
    AlreadyHeld(i64),

    #[error("{field} does not apply to a {kind} supply")]
    WrongSupplyKind {
        field: &'static str,
        kind: &'static str,
    },

    #[error("no {kind} with id {id}")]
    UnknownEntity { kind: EntityKind, id: i64 },
}

/// The backing store failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation failed: {0}")]
    Failed(String),

    #[error("stored {kind} {id} is not valid: {reason}")]
    Corrupt {
        kind: EntityKind,
        id: i64,
        reason: String,
    },
}

/// Either kind of failure an operation of the core can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
