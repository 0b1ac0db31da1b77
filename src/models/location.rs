use serde::{Deserialize, Serialize};

use super::dates::require_text;
use super::{DisasterVictim, Supply};
use crate::error::ValidationError;
use crate::ids::{EntityKind, IdAllocator};

/// A shelter or site that houses victims and keeps a shared inventory.
///
/// # Invariant
/// Personal belongings never appear in `inventory`; they are owned by a
/// single person and can only travel in a victim's personal inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    id: i64,
    name: String,
    address: String,
    occupants: Vec<i64>,
    inventory: Vec<Supply>,
}

/// What happened to a supply handed out by [`Location::allocate_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// The supply moved into the victim's personal inventory.
    Transferred { supply_id: i64 },
    /// The supply was consumable and is no longer tracked.
    Consumed(Supply),
}

impl Location {
    pub fn new(ids: &IdAllocator, name: &str, address: &str) -> Result<Self, ValidationError> {
        let name = require_text("name", name)?;
        let address = require_text("address", address)?;
        Ok(Self {
            id: ids.next_id(EntityKind::Location),
            name,
            address,
            occupants: Vec::new(),
            inventory: Vec::new(),
        })
    }

    /// Rebuilds a stored location, enforcing the inventory invariant.
    pub fn restore(
        id: i64,
        name: &str,
        address: &str,
        occupants: Vec<i64>,
        inventory: Vec<Supply>,
    ) -> Result<Self, ValidationError> {
        let mut location = Self {
            id,
            name: require_text("name", name)?,
            address: require_text("address", address)?,
            occupants,
            inventory: Vec::with_capacity(inventory.len()),
        };
        for supply in inventory {
            location.add_item(supply)?;
        }
        Ok(location)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ValidationError> {
        self.name = require_text("name", name)?;
        Ok(())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn set_address(&mut self, address: &str) -> Result<(), ValidationError> {
        self.address = require_text("address", address)?;
        Ok(())
    }

    pub fn occupants(&self) -> &[i64] {
        &self.occupants
    }

    pub fn has_occupant(&self, person_id: i64) -> bool {
        self.occupants.contains(&person_id)
    }

    pub fn add_occupant(&mut self, victim: &DisasterVictim) {
        self.occupants.push(victim.id());
    }

    pub fn remove_occupant(&mut self, person_id: i64) -> Result<(), ValidationError> {
        let index = self
            .occupants
            .iter()
            .position(|id| *id == person_id)
            .ok_or(ValidationError::NotAnOccupant(person_id))?;
        self.occupants.remove(index);
        Ok(())
    }

    pub(crate) fn forget_occupant(&mut self, person_id: i64) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|id| *id != person_id);
        before != self.occupants.len()
    }

    pub fn inventory(&self) -> &[Supply] {
        &self.inventory
    }

    pub fn has_item(&self, supply_id: i64) -> bool {
        self.inventory.iter().any(|s| s.id() == supply_id)
    }

    pub fn add_item(&mut self, supply: Supply) -> Result<(), ValidationError> {
        if supply.is_personal_belonging() {
            return Err(ValidationError::PersonalBelonging(supply.id()));
        }
        self.inventory.push(supply);
        Ok(())
    }

    /// Removes the supply with this ID; absent items are ignored.
    pub fn remove_item(&mut self, supply_id: i64) -> Option<Supply> {
        let index = self.inventory.iter().position(|s| s.id() == supply_id)?;
        Some(self.inventory.remove(index))
    }

    /// Overwrites the held copy of `supply`, if this location holds it.
    pub(crate) fn refresh_item(&mut self, supply: &Supply) -> bool {
        match self.inventory.iter_mut().find(|s| s.id() == supply.id()) {
            Some(held) => {
                *held = supply.clone();
                true
            }
            None => false,
        }
    }

    /// Hands a supply from this location's inventory to `victim`.
    ///
    /// Water is consumed: it leaves the inventory and is returned as
    /// [`Allocation::Consumed`] without entering the victim's inventory.
    /// Every other kind moves into the victim's personal inventory.
    pub fn allocate_item(
        &mut self,
        victim: &mut DisasterVictim,
        supply_id: i64,
    ) -> Result<Allocation, ValidationError> {
        let index = self
            .inventory
            .iter()
            .position(|s| s.id() == supply_id)
            .ok_or(ValidationError::NotInInventory(supply_id))?;
        if self.inventory[index].is_personal_belonging() {
            return Err(ValidationError::PersonalBelonging(supply_id));
        }

        let supply = self.inventory.remove(index);
        if supply.is_water() {
            return Ok(Allocation::Consumed(supply));
        }
        victim.add_item(supply);
        Ok(Allocation::Transferred { supply_id })
    }
}
