//! Domain models for the relief tracker.
//!
//! # Core Concepts
//!
//! ## People
//!
//! - [`Person`]: anyone known to the operation. Belongs to at most one
//!   [`FamilyGroup`] (first assignment wins).
//! - [`DisasterVictim`]: a person with a personal inventory of supplies.
//! - [`PersonRecord`]: what the controller stores, either of the above.
//! - [`FamilyGroup`]: a non-empty set of people who belong together.
//!
//! ## Places and Things
//!
//! - [`Location`]: a shelter with occupants and a shared inventory.
//! - [`Supply`]: an item; [`SupplyItem`] decides how it moves. Water is
//!   consumed on allocation, personal belongings never enter a location.
//!
//! ## Records
//!
//! - [`MedicalRecord`]: treatment given to a person at a location.
//! - [`Inquiry`]: a request for news about a missing victim.
//!
//! Relationships between entities are held by ID, so an entity never owns
//! another entity it merely refers to.

mod dates;
mod family;
mod inquiry;
mod location;
mod medical;
mod person;
mod supply;

pub use dates::*;
pub use family::*;
pub use inquiry::*;
pub use location::*;
pub use medical::*;
pub use person::*;
pub use supply::*;
