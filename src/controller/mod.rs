//! In-memory collections mirrored to a backing store.
//!
//! Every write applies to memory first and then goes to the store. A store
//! failure does not undo the in-memory change (except for
//! [`Controller::delete_person`], which is all-or-nothing); the caller finds
//! out through the returned [`WriteOutcome`].

mod repository;

pub use repository::Repository;

use crate::error::{PersistenceError, Result, ValidationError};
use crate::ids::{EntityKind, IdAllocator};
use crate::models::*;
use crate::store::{Backend, CascadeReport, Entity, Store, StoreResult};

/// What happened to a write that passed validation.
#[derive(Debug)]
pub struct WriteOutcome {
    /// The in-memory collections reflect the change.
    pub local_applied: bool,
    /// Every store write went through.
    pub persisted: bool,
    /// The first store failure, if any.
    pub failure: Option<PersistenceError>,
}

impl WriteOutcome {
    fn complete() -> Self {
        Self {
            local_applied: true,
            persisted: true,
            failure: None,
        }
    }

    fn skipped() -> Self {
        Self {
            local_applied: false,
            persisted: false,
            failure: None,
        }
    }

    fn from_store(local_applied: bool, result: StoreResult<bool>) -> Self {
        match result {
            Ok(persisted) => Self {
                local_applied,
                persisted,
                failure: None,
            },
            Err(err) => Self {
                local_applied,
                persisted: false,
                failure: Some(err),
            },
        }
    }

    /// Folds a later step of the same operation into this outcome.
    fn merge(&mut self, other: WriteOutcome) {
        self.local_applied &= other.local_applied;
        self.persisted &= other.persisted;
        if self.failure.is_none() {
            self.failure = other.failure;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.local_applied && self.persisted
    }

    /// Turns a store failure into an error, dropping the partial-success
    /// details.
    pub fn into_result(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

struct Snapshot {
    people: Repository<PersonRecord>,
    supplies: Repository<Supply>,
    locations: Repository<Location>,
    families: Repository<FamilyGroup>,
    medical_records: Repository<MedicalRecord>,
    inquiries: Repository<Inquiry>,
}

fn unknown(kind: EntityKind, id: i64) -> ValidationError {
    ValidationError::UnknownEntity { kind, id }
}

fn load_all<E, S>(store: &S, ids: &IdAllocator) -> StoreResult<Repository<E>>
where
    E: Entity,
    S: Store<E>,
{
    let items = store.read_all()?;
    for item in &items {
        ids.observe(E::KIND, item.id());
    }
    tracing::debug!(kind = E::KIND.as_str(), count = items.len(), "Loaded collection");
    Ok(Repository::from_vec(items))
}

/// Owns the store, the ID allocator and one repository per entity type.
pub struct Controller<S> {
    store: S,
    ids: IdAllocator,
    people: Repository<PersonRecord>,
    supplies: Repository<Supply>,
    locations: Repository<Location>,
    families: Repository<FamilyGroup>,
    medical_records: Repository<MedicalRecord>,
    inquiries: Repository<Inquiry>,
}

impl<S: Backend> Controller<S> {
    /// A controller with empty collections, for a store known to be empty.
    pub fn new(store: S, ids: IdAllocator) -> Self {
        Self {
            store,
            ids,
            people: Repository::new(),
            supplies: Repository::new(),
            locations: Repository::new(),
            families: Repository::new(),
            medical_records: Repository::new(),
            inquiries: Repository::new(),
        }
    }

    /// Reads every collection from the store and advances `ids` past every
    /// stored ID.
    pub fn load(store: S, ids: IdAllocator) -> Result<Self> {
        let people: Repository<PersonRecord> = load_all(&store, &ids)?;
        let supplies: Repository<Supply> = load_all(&store, &ids)?;
        let locations: Repository<Location> = load_all(&store, &ids)?;
        let families: Repository<FamilyGroup> = load_all(&store, &ids)?;
        let medical_records: Repository<MedicalRecord> = load_all(&store, &ids)?;
        let inquiries: Repository<Inquiry> = load_all(&store, &ids)?;

        Ok(Self {
            store,
            ids,
            people,
            supplies,
            locations,
            families,
            medical_records,
            inquiries,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The allocator new entities must be built with.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    // ============================================================
    // Generic writes
    // ============================================================

    fn insert<E>(
        store: &S,
        ids: &IdAllocator,
        repo: &mut Repository<E>,
        entity: E,
    ) -> WriteOutcome
    where
        E: Entity,
        S: Store<E>,
    {
        let id = entity.id();
        repo.add(entity.clone());
        match <S as Store<E>>::create(store, &entity) {
            Ok(()) => {
                tracing::info!(kind = E::KIND.as_str(), id, "Created");
                WriteOutcome::complete()
            }
            Err(err) => {
                if id + 1 == ids.peek(E::KIND) {
                    ids.rollback(E::KIND);
                }
                tracing::warn!(kind = E::KIND.as_str(), id, error = %err, "Create not persisted");
                WriteOutcome::from_store(true, Err(err))
            }
        }
    }

    fn replace<E>(store: &S, repo: &mut Repository<E>, entity: E) -> WriteOutcome
    where
        E: Entity,
        S: Store<E>,
    {
        let id = entity.id();
        if !repo.update(entity.clone()) {
            tracing::debug!(kind = E::KIND.as_str(), id, "Update of unknown entity ignored");
            return WriteOutcome::skipped();
        }
        let result = <S as Store<E>>::update(store, &entity);
        if let Err(err) = &result {
            tracing::warn!(kind = E::KIND.as_str(), id, error = %err, "Update not persisted");
        }
        WriteOutcome::from_store(true, result)
    }

    fn remove<E>(store: &S, repo: &mut Repository<E>, id: i64) -> WriteOutcome
    where
        E: Entity,
        S: Store<E>,
    {
        let local_applied = repo.delete(id) > 0;
        let result = <S as Store<E>>::delete(store, id);
        match &result {
            Ok(_) => tracing::info!(kind = E::KIND.as_str(), id, "Deleted"),
            Err(err) => {
                tracing::warn!(kind = E::KIND.as_str(), id, error = %err, "Delete not persisted")
            }
        }
        WriteOutcome::from_store(local_applied, result)
    }

    pub fn add_person(&mut self, person: impl Into<PersonRecord>) -> WriteOutcome {
        Self::insert(&self.store, &self.ids, &mut self.people, person.into())
    }

    pub fn update_person(&mut self, person: impl Into<PersonRecord>) -> WriteOutcome {
        Self::replace(&self.store, &mut self.people, person.into())
    }

    pub fn add_supply(&mut self, supply: Supply) -> WriteOutcome {
        Self::insert(&self.store, &self.ids, &mut self.supplies, supply)
    }

    /// Updates the catalog entry and every inventory copy of the supply.
    pub fn update_supply(&mut self, supply: Supply) -> WriteOutcome {
        if !self.supplies.contains(supply.id()) {
            return Self::replace(&self.store, &mut self.supplies, supply);
        }
        for location in self.locations.iter_mut() {
            location.refresh_item(&supply);
        }
        for record in self.people.iter_mut() {
            if let Some(victim) = record.as_victim_mut() {
                victim.refresh_item(&supply);
            }
        }
        Self::replace(&self.store, &mut self.supplies, supply)
    }

    /// Deletes a supply from the catalog and from whichever inventory holds it.
    pub fn delete_supply(&mut self, id: i64) -> WriteOutcome {
        for location in self.locations.iter_mut() {
            location.remove_item(id);
        }
        for record in self.people.iter_mut() {
            if let Some(victim) = record.as_victim_mut() {
                victim.remove_item(id);
            }
        }
        Self::remove(&self.store, &mut self.supplies, id)
    }

    pub fn add_location(&mut self, location: Location) -> WriteOutcome {
        Self::insert(&self.store, &self.ids, &mut self.locations, location)
    }

    pub fn update_location(&mut self, location: Location) -> WriteOutcome {
        Self::replace(&self.store, &mut self.locations, location)
    }

    pub fn delete_location(&mut self, id: i64) -> WriteOutcome {
        Self::remove(&self.store, &mut self.locations, id)
    }

    pub fn add_family_group(&mut self, group: FamilyGroup) -> WriteOutcome {
        Self::insert(&self.store, &self.ids, &mut self.families, group)
    }

    pub fn update_family_group(&mut self, group: FamilyGroup) -> WriteOutcome {
        Self::replace(&self.store, &mut self.families, group)
    }

    /// Deletes a group and clears the back reference of its members.
    pub fn delete_family_group(&mut self, id: i64) -> WriteOutcome {
        for record in self.people.iter_mut() {
            if record.person().family_group() == Some(id) {
                record.person_mut().clear_family_group();
            }
        }
        Self::remove(&self.store, &mut self.families, id)
    }

    pub fn add_medical_record(&mut self, record: MedicalRecord) -> WriteOutcome {
        if let Some(person) = self.people.get_mut(record.person()) {
            person.person_mut().add_medical_record(record.id());
        }
        Self::insert(&self.store, &self.ids, &mut self.medical_records, record)
    }

    pub fn update_medical_record(&mut self, record: MedicalRecord) -> WriteOutcome {
        Self::replace(&self.store, &mut self.medical_records, record)
    }

    pub fn delete_medical_record(&mut self, id: i64) -> WriteOutcome {
        for record in self.people.iter_mut() {
            record.person_mut().remove_medical_record(id);
        }
        Self::remove(&self.store, &mut self.medical_records, id)
    }

    pub fn add_inquiry(&mut self, inquiry: Inquiry) -> WriteOutcome {
        Self::insert(&self.store, &self.ids, &mut self.inquiries, inquiry)
    }

    pub fn update_inquiry(&mut self, inquiry: Inquiry) -> WriteOutcome {
        Self::replace(&self.store, &mut self.inquiries, inquiry)
    }

    pub fn delete_inquiry(&mut self, id: i64) -> WriteOutcome {
        Self::remove(&self.store, &mut self.inquiries, id)
    }

    // ============================================================
    // Lookups
    // ============================================================

    fn require_person(&self, id: i64) -> Result<PersonRecord, ValidationError> {
        self.people
            .get(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::Person, id))
    }

    fn require_victim(&self, id: i64) -> Result<DisasterVictim, ValidationError> {
        self.require_person(id)?
            .as_victim()
            .cloned()
            .ok_or(ValidationError::NotAVictim(id))
    }

    fn require_location(&self, id: i64) -> Result<Location, ValidationError> {
        self.locations
            .get(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::Location, id))
    }

    fn require_family(&self, id: i64) -> Result<FamilyGroup, ValidationError> {
        self.families
            .get(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::FamilyGroup, id))
    }

    fn holds_supply(&self, supply_id: i64) -> bool {
        self.locations.any(|l| l.has_item(supply_id))
            || self
                .people
                .any(|p| p.as_victim().is_some_and(|v| v.has_item(supply_id)))
    }

    pub fn person(&self, id: i64) -> Option<PersonRecord> {
        self.people.get(id).cloned()
    }

    pub fn people(&self) -> Vec<PersonRecord> {
        self.people.get_all()
    }

    pub fn victims(&self) -> Vec<DisasterVictim> {
        self.people
            .find_all(PersonRecord::is_victim)
            .into_iter()
            .filter_map(|record| match record {
                PersonRecord::Victim(victim) => Some(victim),
                PersonRecord::Person(_) => None,
            })
            .collect()
    }

    pub fn supply(&self, id: i64) -> Option<Supply> {
        self.supplies.get(id).cloned()
    }

    pub fn supplies(&self) -> Vec<Supply> {
        self.supplies.get_all()
    }

    pub fn location(&self, id: i64) -> Option<Location> {
        self.locations.get(id).cloned()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.locations.get_all()
    }

    pub fn family_group(&self, id: i64) -> Option<FamilyGroup> {
        self.families.get(id).cloned()
    }

    pub fn family_groups(&self) -> Vec<FamilyGroup> {
        self.families.get_all()
    }

    pub fn medical_records(&self) -> Vec<MedicalRecord> {
        self.medical_records.get_all()
    }

    pub fn inquiries(&self) -> Vec<Inquiry> {
        self.inquiries.get_all()
    }

    /// Members of a group in joining order. Unknown groups have none.
    pub fn family_members(&self, group_id: i64) -> Vec<PersonRecord> {
        let Some(group) = self.families.get(group_id) else {
            return Vec::new();
        };
        group
            .members()
            .iter()
            .filter_map(|id| self.people.get(*id).cloned())
            .collect()
    }

    pub fn families_of(&self, person_id: i64) -> Vec<FamilyGroup> {
        self.families.find_all(|g| g.contains(person_id))
    }

    pub fn occupants_of(&self, location_id: i64) -> Vec<DisasterVictim> {
        let Some(location) = self.locations.get(location_id) else {
            return Vec::new();
        };
        location
            .occupants()
            .iter()
            .filter_map(|id| self.people.get(*id))
            .filter_map(|record| record.as_victim().cloned())
            .collect()
    }

    pub fn locations_of(&self, person_id: i64) -> Vec<Location> {
        self.locations.find_all(|l| l.has_occupant(person_id))
    }

    pub fn medical_records_for_person(&self, person_id: i64) -> Vec<MedicalRecord> {
        self.medical_records.find_all(|r| r.person() == person_id)
    }

    pub fn medical_records_for_location(&self, location_id: i64) -> Vec<MedicalRecord> {
        self.medical_records.find_all(|r| r.location() == location_id)
    }

    pub fn inquiries_by_inquirer(&self, person_id: i64) -> Vec<Inquiry> {
        self.inquiries.find_all(|i| i.inquirer() == person_id)
    }

    pub fn inquiries_for_missing_person(&self, person_id: i64) -> Vec<Inquiry> {
        self.inquiries.find_all(|i| i.missing_person() == person_id)
    }

    pub fn inquiries_for_location(&self, location_id: i64) -> Vec<Inquiry> {
        self.inquiries
            .find_all(|i| i.last_known_location() == location_id)
    }

    // ============================================================
    // Workflows
    // ============================================================

    /// Houses a victim at a location.
    pub fn admit_occupant(&mut self, location_id: i64, person_id: i64) -> Result<WriteOutcome> {
        let victim = self.require_victim(person_id)?;
        let mut location = self.require_location(location_id)?;
        location.add_occupant(&victim);
        tracing::info!(location_id, person_id, "Admitted occupant");
        Ok(Self::replace(&self.store, &mut self.locations, location))
    }

    pub fn discharge_occupant(&mut self, location_id: i64, person_id: i64) -> Result<WriteOutcome> {
        let mut location = self.require_location(location_id)?;
        location.remove_occupant(person_id)?;
        tracing::info!(location_id, person_id, "Discharged occupant");
        Ok(Self::replace(&self.store, &mut self.locations, location))
    }

    /// Puts a supply into a location's inventory, adding it to the catalog
    /// first if it is new. A supply held by any location or victim is
    /// rejected.
    pub fn stock_location(&mut self, location_id: i64, supply: Supply) -> Result<WriteOutcome> {
        let mut location = self.require_location(location_id)?;
        if self.holds_supply(supply.id()) {
            return Err(ValidationError::AlreadyHeld(supply.id()).into());
        }
        location.add_item(supply.clone())?;

        let mut outcome = if self.supplies.contains(supply.id()) {
            WriteOutcome::complete()
        } else {
            Self::insert(&self.store, &self.ids, &mut self.supplies, supply)
        };
        outcome.merge(Self::replace(&self.store, &mut self.locations, location));
        Ok(outcome)
    }

    /// Hands a supply from a location to one of the victims.
    ///
    /// Water is consumed and stamped with `date` in the catalog. Any other
    /// supply moves into the victim's personal inventory.
    pub fn allocate_supply(
        &mut self,
        location_id: i64,
        person_id: i64,
        supply_id: i64,
        date: Date,
    ) -> Result<WriteOutcome> {
        let mut location = self.require_location(location_id)?;
        let mut victim = self.require_victim(person_id)?;

        match location.allocate_item(&mut victim, supply_id)? {
            Allocation::Transferred { supply_id } => {
                tracing::info!(location_id, person_id, supply_id, "Transferred supply");
                let mut outcome = Self::replace(&self.store, &mut self.locations, location);
                outcome.merge(Self::replace(
                    &self.store,
                    &mut self.people,
                    PersonRecord::Victim(victim),
                ));
                Ok(outcome)
            }
            Allocation::Consumed(mut supply) => {
                supply.stamp_allocation(date)?;
                tracing::info!(location_id, person_id, supply_id, %date, "Consumed supply");
                let mut outcome = Self::replace(&self.store, &mut self.locations, location);
                if self.supplies.contains(supply_id) {
                    outcome.merge(Self::replace(&self.store, &mut self.supplies, supply));
                }
                Ok(outcome)
            }
        }
    }

    /// Records a treatment and links it to the person. Returns the new
    /// record's ID.
    pub fn record_treatment(
        &mut self,
        person_id: i64,
        location_id: i64,
        details: &str,
        date: &str,
    ) -> Result<(i64, WriteOutcome)> {
        let person = self.require_person(person_id)?;
        let location = self.require_location(location_id)?;
        let record = MedicalRecord::new(&self.ids, person.person(), &location, details, date)?;
        let id = record.id();
        Ok((id, self.add_medical_record(record)))
    }

    /// Files an inquiry about a missing victim. Returns the new inquiry's ID.
    pub fn file_inquiry(
        &mut self,
        inquirer_id: i64,
        missing_person_id: i64,
        date: &str,
        info: &str,
        last_known_location_id: i64,
    ) -> Result<(i64, WriteOutcome)> {
        let inquirer = self.require_person(inquirer_id)?;
        let missing = self.require_person(missing_person_id)?;
        let location = self.require_location(last_known_location_id)?;
        let inquiry = inquirer
            .person()
            .create_inquiry(&self.ids, &missing, date, info, &location)?;
        let id = inquiry.id();
        Ok((id, self.add_inquiry(inquiry)))
    }

    /// Groups people into a new family. Members already in a family keep
    /// their existing back reference. Returns the new group's ID.
    pub fn form_family(&mut self, member_ids: &[i64]) -> Result<(i64, WriteOutcome)> {
        let members = member_ids
            .iter()
            .map(|id| self.require_person(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&Person> = members.iter().map(PersonRecord::person).collect();
        let group = FamilyGroup::new(&self.ids, &refs)?;
        let group_id = group.id();

        let mut outcome = Self::insert(&self.store, &self.ids, &mut self.families, group);
        for mut record in members {
            if record.person_mut().try_set_family_group(group_id) {
                outcome.merge(Self::replace(&self.store, &mut self.people, record));
            }
        }
        Ok((group_id, outcome))
    }

    pub fn join_family(&mut self, group_id: i64, person_id: i64) -> Result<WriteOutcome> {
        let mut group = self.require_family(group_id)?;
        let mut record = self.require_person(person_id)?;
        group.add_member(record.person());

        let mut outcome = Self::replace(&self.store, &mut self.families, group);
        if record.person_mut().try_set_family_group(group_id) {
            outcome.merge(Self::replace(&self.store, &mut self.people, record));
        }
        Ok(outcome)
    }

    pub fn leave_family(&mut self, group_id: i64, person_id: i64) -> Result<WriteOutcome> {
        let mut group = self.require_family(group_id)?;
        group.remove_member(person_id)?;

        let mut outcome = Self::replace(&self.store, &mut self.families, group);
        if let Some(mut record) = self.person(person_id) {
            if record.person().family_group() == Some(group_id) {
                record.person_mut().clear_family_group();
                outcome.merge(Self::replace(&self.store, &mut self.people, record));
            }
        }
        Ok(outcome)
    }

    // ============================================================
    // Cascade delete
    // ============================================================

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            people: self.people.clone(),
            supplies: self.supplies.clone(),
            locations: self.locations.clone(),
            families: self.families.clone(),
            medical_records: self.medical_records.clone(),
            inquiries: self.inquiries.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.people = snapshot.people;
        self.supplies = snapshot.supplies;
        self.locations = snapshot.locations;
        self.families = snapshot.families;
        self.medical_records = snapshot.medical_records;
        self.inquiries = snapshot.inquiries;
    }

    /// Deletes a person with their medical records, location and family
    /// memberships, supply allocations and every inquiry they are part of.
    ///
    /// All or nothing: if the store fails, memory is put back the way it was
    /// and the store is left untouched.
    pub fn delete_person(&mut self, person_id: i64) -> Result<CascadeReport> {
        if !self.people.contains(person_id) {
            return Err(unknown(EntityKind::Person, person_id).into());
        }
        let snapshot = self.snapshot();

        self.people.delete(person_id);
        self.medical_records.retain(|r| r.person() != person_id);
        for location in self.locations.iter_mut() {
            location.forget_occupant(person_id);
        }
        for group in self.families.iter_mut() {
            group.forget_member(person_id);
        }
        self.inquiries.retain(|i| !i.involves(person_id));

        match self.store.delete_person_cascade(person_id) {
            Ok(report) => Ok(report),
            Err(err) => {
                tracing::warn!(person_id, error = %err, "Cascade delete failed, restoring state");
                self.restore(snapshot);
                Err(err.into())
            }
        }
    }
}
