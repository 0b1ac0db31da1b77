use serde::{Deserialize, Serialize};

use super::dates::{require_text, Date};
use super::{Location, Person};
use crate::error::ValidationError;
use crate::ids::{EntityKind, IdAllocator};

/// Treatment given to a person at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    id: i64,
    person: i64,
    location: i64,
    treatment_details: String,
    date_of_treatment: Date,
}

impl MedicalRecord {
    /// `date` may be a plain `YYYY-MM-DD` date or a timestamp; only the date
    /// part of a timestamp is kept.
    pub fn new(
        ids: &IdAllocator,
        person: &Person,
        location: &Location,
        treatment_details: &str,
        date: &str,
    ) -> Result<Self, ValidationError> {
        let treatment_details = require_text("treatment details", treatment_details)?;
        let date_of_treatment = Date::parse_date_or_timestamp(date)?;
        Ok(Self {
            id: ids.next_id(EntityKind::MedicalRecord),
            person: person.id(),
            location: location.id(),
            treatment_details,
            date_of_treatment,
        })
    }

    pub fn restore(
        id: i64,
        person: i64,
        location: i64,
        treatment_details: &str,
        date: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            person,
            location,
            treatment_details: require_text("treatment details", treatment_details)?,
            date_of_treatment: Date::parse_date_or_timestamp(date)?,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn person(&self) -> i64 {
        self.person
    }

    pub fn set_person(&mut self, person: &Person) {
        self.person = person.id();
    }

    pub fn location(&self) -> i64 {
        self.location
    }

    pub fn set_location(&mut self, location: &Location) {
        self.location = location.id();
    }

    pub fn treatment_details(&self) -> &str {
        &self.treatment_details
    }

    pub fn set_treatment_details(&mut self, details: &str) -> Result<(), ValidationError> {
        self.treatment_details = require_text("treatment details", details)?;
        Ok(())
    }

    pub fn date_of_treatment(&self) -> Date {
        self.date_of_treatment
    }

    pub fn set_date_of_treatment(&mut self, date: &str) -> Result<(), ValidationError> {
        self.date_of_treatment = Date::parse_date_or_timestamp(date)?;
        Ok(())
    }
}
