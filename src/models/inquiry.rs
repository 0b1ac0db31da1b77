use serde::{Deserialize, Serialize};

use super::dates::{require_text, Date};
use super::{DisasterVictim, Location, Person};
use crate::error::ValidationError;
use crate::ids::{EntityKind, IdAllocator};

/// A request for information about a missing disaster victim.
///
/// The inquirer can be anyone; the missing person is always a victim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    id: i64,
    inquirer: i64,
    missing_person: i64,
    date_of_inquiry: Date,
    info_provided: String,
    last_known_location: i64,
}

impl Inquiry {
    pub fn new(
        ids: &IdAllocator,
        inquirer: &Person,
        missing_person: &DisasterVictim,
        date: &str,
        info_provided: &str,
        last_known_location: &Location,
    ) -> Result<Self, ValidationError> {
        let date_of_inquiry = Date::parse(date)?;
        let info_provided = require_text("info provided", info_provided)?;
        Ok(Self {
            id: ids.next_id(EntityKind::Inquiry),
            inquirer: inquirer.id(),
            missing_person: missing_person.id(),
            date_of_inquiry,
            info_provided,
            last_known_location: last_known_location.id(),
        })
    }

    pub fn restore(
        id: i64,
        inquirer: i64,
        missing_person: i64,
        date: &str,
        info_provided: &str,
        last_known_location: i64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            inquirer,
            missing_person,
            date_of_inquiry: Date::parse(date)?,
            info_provided: require_text("info provided", info_provided)?,
            last_known_location,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn inquirer(&self) -> i64 {
        self.inquirer
    }

    pub fn set_inquirer(&mut self, inquirer: &Person) {
        self.inquirer = inquirer.id();
    }

    pub fn missing_person(&self) -> i64 {
        self.missing_person
    }

    pub fn set_missing_person(&mut self, victim: &DisasterVictim) {
        self.missing_person = victim.id();
    }

    /// Whether `person_id` appears on either side of the inquiry.
    pub fn involves(&self, person_id: i64) -> bool {
        self.inquirer == person_id || self.missing_person == person_id
    }

    pub fn date_of_inquiry(&self) -> Date {
        self.date_of_inquiry
    }

    pub fn set_date_of_inquiry(&mut self, date: &str) -> Result<(), ValidationError> {
        self.date_of_inquiry = Date::parse(date)?;
        Ok(())
    }

    pub fn info_provided(&self) -> &str {
        &self.info_provided
    }

    pub fn set_info_provided(&mut self, info: &str) -> Result<(), ValidationError> {
        self.info_provided = require_text("info provided", info)?;
        Ok(())
    }

    pub fn last_known_location(&self) -> i64 {
        self.last_known_location
    }

    pub fn set_last_known_location(&mut self, location: &Location) {
        self.last_known_location = location.id();
    }
}
