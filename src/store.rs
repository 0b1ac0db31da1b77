//! The persistence collaborator the controller talks to.
//!
//! The core never executes SQL itself. It goes through these traits, which
//! [`Database`](crate::db::Database) implements on top of SQLite.

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::ids::EntityKind;
use crate::models::*;

pub type StoreResult<T> = Result<T, PersistenceError>;

/// An entity with a type-scoped identifier.
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> i64;
}

impl Entity for PersonRecord {
    const KIND: EntityKind = EntityKind::Person;

    fn id(&self) -> i64 {
        PersonRecord::id(self)
    }
}

impl Entity for Supply {
    const KIND: EntityKind = EntityKind::Supply;

    fn id(&self) -> i64 {
        Supply::id(self)
    }
}

impl Entity for Location {
    const KIND: EntityKind = EntityKind::Location;

    fn id(&self) -> i64 {
        Location::id(self)
    }
}

impl Entity for FamilyGroup {
    const KIND: EntityKind = EntityKind::FamilyGroup;

    fn id(&self) -> i64 {
        FamilyGroup::id(self)
    }
}

impl Entity for MedicalRecord {
    const KIND: EntityKind = EntityKind::MedicalRecord;

    fn id(&self) -> i64 {
        MedicalRecord::id(self)
    }
}

impl Entity for Inquiry {
    const KIND: EntityKind = EntityKind::Inquiry;

    fn id(&self) -> i64 {
        Inquiry::id(self)
    }
}

/// Basic CRUD for one entity type.
pub trait Store<E: Entity> {
    fn create(&self, entity: &E) -> StoreResult<()>;

    fn read_all(&self) -> StoreResult<Vec<E>>;

    fn read_by_id(&self, id: i64) -> StoreResult<Option<E>>;

    /// Returns `false` when no stored entity has this ID.
    fn update(&self, entity: &E) -> StoreResult<bool>;

    /// Returns `false` when no stored entity has this ID.
    fn delete(&self, id: i64) -> StoreResult<bool>;
}

/// Counts of rows removed by [`Relations::delete_person_cascade`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub medical_records: usize,
    pub location_memberships: usize,
    pub supply_allocations: usize,
    pub family_memberships: usize,
    pub inquiries: usize,
}

/// Relationship queries and the one transactional write.
pub trait Relations {
    /// Person IDs housed at a location.
    fn occupants_at(&self, location_id: i64) -> StoreResult<Vec<i64>>;

    fn supplies_for_person(&self, person_id: i64) -> StoreResult<Vec<Supply>>;

    fn supplies_for_location(&self, location_id: i64) -> StoreResult<Vec<Supply>>;

    fn medical_records_for_person(&self, person_id: i64) -> StoreResult<Vec<MedicalRecord>>;

    fn medical_records_for_location(&self, location_id: i64) -> StoreResult<Vec<MedicalRecord>>;

    fn inquiries_by_inquirer(&self, person_id: i64) -> StoreResult<Vec<Inquiry>>;

    fn inquiries_for_missing_person(&self, person_id: i64) -> StoreResult<Vec<Inquiry>>;

    fn inquiries_for_location(&self, location_id: i64) -> StoreResult<Vec<Inquiry>>;

    /// Deletes a person and every row that references them.
    ///
    /// Either everything is deleted or nothing is.
    fn delete_person_cascade(&self, person_id: i64) -> StoreResult<CascadeReport>;
}

/// Everything the controller needs from a backing store.
pub trait Backend:
    Store<PersonRecord>
    + Store<Supply>
    + Store<Location>
    + Store<FamilyGroup>
    + Store<MedicalRecord>
    + Store<Inquiry>
    + Relations
{
}

impl<T> Backend for T where
    T: Store<PersonRecord>
        + Store<Supply>
        + Store<Location>
        + Store<FamilyGroup>
        + Store<MedicalRecord>
        + Store<Inquiry>
        + Relations
{
}
