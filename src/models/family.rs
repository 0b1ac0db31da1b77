use serde::{Deserialize, Serialize};

use super::Person;
use crate::error::ValidationError;
use crate::ids::{EntityKind, IdAllocator};

/// People who belong together, e.g. a household separated by the disaster.
///
/// Members are referenced by ID and shared with the rest of the model; the
/// group does not control their lifecycle. A group always starts with at
/// least one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyGroup {
    id: i64,
    members: Vec<i64>,
}

impl FamilyGroup {
    pub fn new(ids: &IdAllocator, members: &[&Person]) -> Result<Self, ValidationError> {
        if members.is_empty() {
            return Err(ValidationError::EmptyFamilyGroup);
        }
        let mut group = Self {
            id: ids.next_id(EntityKind::FamilyGroup),
            members: Vec::with_capacity(members.len()),
        };
        for member in members {
            group.add_member(member);
        }
        Ok(group)
    }

    /// Rebuilds a stored group from its member IDs.
    ///
    /// Only creation demands a member; a stored group may have lost all of
    /// its members since.
    pub fn restore(id: i64, members: Vec<i64>) -> Self {
        Self { id, members }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Member IDs in the order they joined.
    pub fn members(&self) -> &[i64] {
        &self.members
    }

    pub fn contains(&self, person_id: i64) -> bool {
        self.members.contains(&person_id)
    }

    /// Adds `person` unless they are already a member.
    pub fn add_member(&mut self, person: &Person) {
        if !self.contains(person.id()) {
            self.members.push(person.id());
        }
    }

    pub fn remove_member(&mut self, person_id: i64) -> Result<(), ValidationError> {
        let index = self
            .members
            .iter()
            .position(|id| *id == person_id)
            .ok_or(ValidationError::NotAMember(person_id))?;
        self.members.remove(index);
        Ok(())
    }

    pub(crate) fn forget_member(&mut self, person_id: i64) {
        self.members.retain(|id| *id != person_id);
    }
}
