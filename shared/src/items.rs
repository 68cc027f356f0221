//! Item stacks held in mount inventories.

use serde::{Deserialize, Serialize};

/// Inventory slot holding the saddle (or carpet for llamas)
pub const SADDLE_SLOT: usize = 0;

/// Inventory slot holding horse armour
pub const ARMOR_SLOT: usize = 1;

/// First free cargo slot of chest-carrying mounts
pub const CARGO_START_SLOT: usize = 2;

/// Material name the host uses for an empty slot
pub const AIR: &str = "air";

/// A stack of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: String,
    pub amount: u32,
}

impl ItemStack {
    /// A single item of the given material
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            amount: 1,
        }
    }

    pub fn with_amount(material: impl Into<String>, amount: u32) -> Self {
        Self {
            material: material.into(),
            amount,
        }
    }

    /// Whether this stack represents an empty slot
    pub fn is_air(&self) -> bool {
        self.amount == 0 || self.material.eq_ignore_ascii_case(AIR)
    }

    /// Collapse empty-slot stacks into `None`
    pub fn into_slot(self) -> Option<Self> {
        if self.is_air() {
            None
        } else {
            Some(self)
        }
    }
}
