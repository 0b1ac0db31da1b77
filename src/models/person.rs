use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use super::dates::{is_valid_phone_number, require_text, Date};
use super::{Inquiry, Location, Supply};
use crate::error::ValidationError;
use crate::ids::{EntityKind, IdAllocator};

/// Someone known to the relief operation: a victim, a relative asking about
/// a victim, a volunteer.
///
/// A person belongs to at most one family group. The group is recorded by ID
/// only; the group does not own the person and the person does not own the
/// group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    id: i64,
    first_name: String,
    last_name: String,
    date_of_birth: Option<Date>,
    gender: Option<String>,
    comments: Option<String>,
    phone_number: Option<String>,
    family_group: Option<i64>,
    medical_records: Vec<i64>,
}

impl Person {
    pub fn new(
        ids: &IdAllocator,
        first_name: &str,
        last_name: &str,
    ) -> Result<Self, ValidationError> {
        let first_name = require_text("first name", first_name)?;
        let last_name = require_text("last name", last_name)?;
        Ok(Self::with_id(ids.next_id(EntityKind::Person), first_name, last_name))
    }

    pub fn with_birth_date(
        ids: &IdAllocator,
        first_name: &str,
        last_name: &str,
        date_of_birth: &str,
    ) -> Result<Self, ValidationError> {
        let first_name = require_text("first name", first_name)?;
        let last_name = require_text("last name", last_name)?;
        let date_of_birth = Date::parse(date_of_birth)?;
        let mut person = Self::with_id(ids.next_id(EntityKind::Person), first_name, last_name);
        person.date_of_birth = Some(date_of_birth);
        Ok(person)
    }

    /// Rebuilds a person that already has an identity.
    pub fn restore(id: i64, first_name: &str, last_name: &str) -> Result<Self, ValidationError> {
        Ok(Self::with_id(
            id,
            require_text("first name", first_name)?,
            require_text("last name", last_name)?,
        ))
    }

    fn with_id(id: i64, first_name: String, last_name: String) -> Self {
        Self {
            id,
            first_name,
            last_name,
            date_of_birth: None,
            gender: None,
            comments: None,
            phone_number: None,
            family_group: None,
            medical_records: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn set_first_name(&mut self, name: &str) -> Result<(), ValidationError> {
        self.first_name = require_text("first name", name)?;
        Ok(())
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn set_last_name(&mut self, name: &str) -> Result<(), ValidationError> {
        self.last_name = require_text("last name", name)?;
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn date_of_birth(&self) -> Option<Date> {
        self.date_of_birth
    }

    pub fn set_date_of_birth(&mut self, date: &str) -> Result<(), ValidationError> {
        self.date_of_birth = Some(Date::parse(date)?);
        Ok(())
    }

    pub fn clear_date_of_birth(&mut self) {
        self.date_of_birth = None;
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn set_gender(&mut self, gender: &str) -> Result<(), ValidationError> {
        self.gender = Some(require_text("gender", gender)?);
        Ok(())
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn set_comments(&mut self, comments: &str) -> Result<(), ValidationError> {
        self.comments = Some(require_text("comments", comments)?);
        Ok(())
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Stores `number` if it has the `XXX-XXX-XXXX` shape and ignores it
    /// otherwise. Use [`try_set_phone_number`](Self::try_set_phone_number)
    /// to be told about rejected input.
    pub fn set_phone_number(&mut self, number: &str) {
        let _ = self.try_set_phone_number(number);
    }

    pub fn try_set_phone_number(&mut self, number: &str) -> Result<(), ValidationError> {
        if !is_valid_phone_number(number) {
            return Err(ValidationError::InvalidPhoneNumber(number.to_string()));
        }
        self.phone_number = Some(number.to_string());
        Ok(())
    }

    pub fn family_group(&self) -> Option<i64> {
        self.family_group
    }

    /// Records the person's family group if they do not have one yet.
    ///
    /// The first group assigned wins. Returns `false`, leaving the existing
    /// association untouched, when a group was already set.
    pub fn try_set_family_group(&mut self, group_id: i64) -> bool {
        if self.family_group.is_some() {
            return false;
        }
        self.family_group = Some(group_id);
        true
    }

    pub(crate) fn clear_family_group(&mut self) {
        self.family_group = None;
    }

    pub fn medical_records(&self) -> &[i64] {
        &self.medical_records
    }

    pub fn add_medical_record(&mut self, record_id: i64) {
        if !self.medical_records.contains(&record_id) {
            self.medical_records.push(record_id);
        }
    }

    pub(crate) fn remove_medical_record(&mut self, record_id: i64) {
        self.medical_records.retain(|id| *id != record_id);
    }

    /// Files an inquiry with this person as the inquirer.
    ///
    /// Only disaster victims can be reported missing, so `missing_person`
    /// must be a [`PersonRecord::Victim`].
    pub fn create_inquiry(
        &self,
        ids: &IdAllocator,
        missing_person: &PersonRecord,
        date: &str,
        info: &str,
        last_known_location: &Location,
    ) -> Result<Inquiry, ValidationError> {
        let victim = missing_person
            .as_victim()
            .ok_or(ValidationError::NotAVictim(missing_person.id()))?;
        Inquiry::new(ids, self, victim, date, info, last_known_location)
    }
}

/// A person affected by the disaster, carrying a personal inventory of
/// supplies handed out to them or belonging to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasterVictim {
    #[serde(flatten)]
    person: Person,
    personal_inventory: Vec<Supply>,
}

impl DisasterVictim {
    pub fn new(
        ids: &IdAllocator,
        first_name: &str,
        last_name: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self::from_person(Person::new(ids, first_name, last_name)?))
    }

    pub fn with_birth_date(
        ids: &IdAllocator,
        first_name: &str,
        last_name: &str,
        date_of_birth: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self::from_person(Person::with_birth_date(
            ids,
            first_name,
            last_name,
            date_of_birth,
        )?))
    }

    pub fn from_person(person: Person) -> Self {
        Self {
            person,
            personal_inventory: Vec::new(),
        }
    }

    pub fn person(&self) -> &Person {
        &self.person
    }

    pub fn into_person(self) -> Person {
        self.person
    }

    pub fn personal_inventory(&self) -> &[Supply] {
        &self.personal_inventory
    }

    pub fn has_item(&self, supply_id: i64) -> bool {
        self.personal_inventory.iter().any(|s| s.id() == supply_id)
    }

    pub fn add_item(&mut self, supply: Supply) {
        self.personal_inventory.push(supply);
    }

    /// Removes the supply with this ID; absent items are ignored.
    pub fn remove_item(&mut self, supply_id: i64) -> Option<Supply> {
        let index = self
            .personal_inventory
            .iter()
            .position(|s| s.id() == supply_id)?;
        Some(self.personal_inventory.remove(index))
    }

    pub(crate) fn refresh_item(&mut self, supply: &Supply) -> bool {
        match self
            .personal_inventory
            .iter_mut()
            .find(|s| s.id() == supply.id())
        {
            Some(held) => {
                *held = supply.clone();
                true
            }
            None => false,
        }
    }
}

impl Deref for DisasterVictim {
    type Target = Person;

    fn deref(&self) -> &Person {
        &self.person
    }
}

impl DerefMut for DisasterVictim {
    fn deref_mut(&mut self) -> &mut Person {
        &mut self.person
    }
}

/// A registered person as held by the controller: either a plain person or a
/// disaster victim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PersonRecord {
    Person(Person),
    Victim(DisasterVictim),
}

impl PersonRecord {
    pub fn id(&self) -> i64 {
        self.person().id()
    }

    pub fn person(&self) -> &Person {
        match self {
            Self::Person(p) => p,
            Self::Victim(v) => v.person(),
        }
    }

    pub fn person_mut(&mut self) -> &mut Person {
        match self {
            Self::Person(p) => p,
            Self::Victim(v) => &mut v.person,
        }
    }

    pub fn is_victim(&self) -> bool {
        matches!(self, Self::Victim(_))
    }

    pub fn as_victim(&self) -> Option<&DisasterVictim> {
        match self {
            Self::Victim(v) => Some(v),
            Self::Person(_) => None,
        }
    }

    pub fn as_victim_mut(&mut self) -> Option<&mut DisasterVictim> {
        match self {
            Self::Victim(v) => Some(v),
            Self::Person(_) => None,
        }
    }
}

impl From<Person> for PersonRecord {
    fn from(person: Person) -> Self {
        Self::Person(person)
    }
}

impl From<DisasterVictim> for PersonRecord {
    fn from(victim: DisasterVictim) -> Self {
        Self::Victim(victim)
    }
}
