use serde::{Deserialize, Serialize};

use super::dates::{require_text, Date};
use crate::error::ValidationError;
use crate::ids::{EntityKind, IdAllocator};

/// An item tracked by the relief operation.
///
/// Every supply carries a name and a free-form category label (`kind`). What
/// the supply *is* lives in [`SupplyItem`], which decides how it may move:
///
/// - personal belongings are owned by one person and never enter a
///   location's shared inventory,
/// - water is consumed when handed out and stops being tracked,
/// - everything else changes custody from a location to a victim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    id: i64,
    name: String,
    kind: String,
    item: SupplyItem,
}

/// The kind-specific part of a [`Supply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupplyItem {
    Generic,
    Blanket,
    Cot {
        room_location: String,
        grid_location: String,
    },
    PersonalBelonging {
        description: String,
    },
    Water {
        /// Set once the water has been handed out.
        allocation_date: Option<Date>,
    },
}

impl SupplyItem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Blanket => "blanket",
            Self::Cot { .. } => "cot",
            Self::PersonalBelonging { .. } => "personal_belonging",
            Self::Water { .. } => "water",
        }
    }
}

impl Supply {
    fn build(
        ids: &IdAllocator,
        name: &str,
        kind: &str,
        item: SupplyItem,
    ) -> Result<Self, ValidationError> {
        let name = require_text("name", name)?;
        let kind = require_text("kind", kind)?;
        Ok(Self {
            id: ids.next_id(EntityKind::Supply),
            name,
            kind,
            item,
        })
    }

    pub fn generic(ids: &IdAllocator, name: &str, kind: &str) -> Result<Self, ValidationError> {
        Self::build(ids, name, kind, SupplyItem::Generic)
    }

    pub fn blanket(ids: &IdAllocator, name: &str, kind: &str) -> Result<Self, ValidationError> {
        Self::build(ids, name, kind, SupplyItem::Blanket)
    }

    pub fn cot(
        ids: &IdAllocator,
        name: &str,
        kind: &str,
        room_location: &str,
        grid_location: &str,
    ) -> Result<Self, ValidationError> {
        let item = SupplyItem::Cot {
            room_location: require_text("room location", room_location)?,
            grid_location: require_text("grid location", grid_location)?,
        };
        Self::build(ids, name, kind, item)
    }

    pub fn personal_belonging(
        ids: &IdAllocator,
        name: &str,
        kind: &str,
        description: &str,
    ) -> Result<Self, ValidationError> {
        let item = SupplyItem::PersonalBelonging {
            description: require_text("description", description)?,
        };
        Self::build(ids, name, kind, item)
    }

    pub fn water(ids: &IdAllocator, name: &str, kind: &str) -> Result<Self, ValidationError> {
        Self::build(
            ids,
            name,
            kind,
            SupplyItem::Water {
                allocation_date: None,
            },
        )
    }

    /// Rebuilds a supply that already has an identity, e.g. when loading it
    /// from the store.
    pub fn restore(
        id: i64,
        name: &str,
        kind: &str,
        item: SupplyItem,
    ) -> Result<Self, ValidationError> {
        if let SupplyItem::Cot {
            room_location,
            grid_location,
        } = &item
        {
            require_text("room location", room_location)?;
            require_text("grid location", grid_location)?;
        }
        if let SupplyItem::PersonalBelonging { description } = &item {
            require_text("description", description)?;
        }
        Ok(Self {
            id,
            name: require_text("name", name)?,
            kind: require_text("kind", kind)?,
            item,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Accepts any value; IDs of zero or below mean "unassigned".
    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn has_assigned_id(&self) -> bool {
        self.id > 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ValidationError> {
        self.name = require_text("name", name)?;
        Ok(())
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: &str) -> Result<(), ValidationError> {
        self.kind = require_text("kind", kind)?;
        Ok(())
    }

    pub fn item(&self) -> &SupplyItem {
        &self.item
    }

    pub fn is_water(&self) -> bool {
        matches!(self.item, SupplyItem::Water { .. })
    }

    pub fn is_personal_belonging(&self) -> bool {
        matches!(self.item, SupplyItem::PersonalBelonging { .. })
    }

    pub fn room_location(&self) -> Option<&str> {
        match &self.item {
            SupplyItem::Cot { room_location, .. } => Some(room_location),
            _ => None,
        }
    }

    pub fn set_room_location(&mut self, room: &str) -> Result<(), ValidationError> {
        let value = require_text("room location", room)?;
        match &mut self.item {
            SupplyItem::Cot { room_location, .. } => {
                *room_location = value;
                Ok(())
            }
            other => Err(wrong_kind("room location", other)),
        }
    }

    pub fn grid_location(&self) -> Option<&str> {
        match &self.item {
            SupplyItem::Cot { grid_location, .. } => Some(grid_location),
            _ => None,
        }
    }

    pub fn set_grid_location(&mut self, grid: &str) -> Result<(), ValidationError> {
        let value = require_text("grid location", grid)?;
        match &mut self.item {
            SupplyItem::Cot { grid_location, .. } => {
                *grid_location = value;
                Ok(())
            }
            other => Err(wrong_kind("grid location", other)),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match &self.item {
            SupplyItem::PersonalBelonging { description } => Some(description),
            _ => None,
        }
    }

    pub fn set_description(&mut self, text: &str) -> Result<(), ValidationError> {
        let value = require_text("description", text)?;
        match &mut self.item {
            SupplyItem::PersonalBelonging { description } => {
                *description = value;
                Ok(())
            }
            other => Err(wrong_kind("description", other)),
        }
    }

    pub fn allocation_date(&self) -> Option<Date> {
        match &self.item {
            SupplyItem::Water { allocation_date } => *allocation_date,
            _ => None,
        }
    }

    pub fn set_allocation_date(&mut self, date: &str) -> Result<(), ValidationError> {
        let value = Date::parse(date)?;
        self.stamp_allocation(value)
    }

    pub(crate) fn stamp_allocation(&mut self, date: Date) -> Result<(), ValidationError> {
        match &mut self.item {
            SupplyItem::Water { allocation_date } => {
                *allocation_date = Some(date);
                Ok(())
            }
            other => Err(wrong_kind("allocation date", other)),
        }
    }
}

fn wrong_kind(field: &'static str, item: &SupplyItem) -> ValidationError {
    ValidationError::WrongSupplyKind {
        field,
        kind: item.as_str(),
    }
}
