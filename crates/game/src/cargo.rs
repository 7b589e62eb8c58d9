//! Cargo hold and credits carried by the player.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Commodity dropped by destroyed ships.
pub const SCRAP: &str = "scrap";

/// A quantity of one commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoItem {
    pub commodity: String,
    pub quantity: u32,
}

impl CargoItem {
    pub fn new(commodity: impl Into<String>, quantity: u32) -> Self {
        Self {
            commodity: commodity.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cargo hold full: {free} free, {needed} needed")]
pub struct CargoFull {
    pub free: u32,
    pub needed: u32,
}

/// Fixed-capacity hold. Part of a commodity can be reserved by a mission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CargoHold {
    pub capacity: u32,
    items: BTreeMap<String, u32>,
    reserved: BTreeMap<String, u32>,
}

impl CargoHold {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn used(&self) -> u32 {
        self.items.values().sum()
    }

    pub fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.used())
    }

    pub fn quantity(&self, commodity: &str) -> u32 {
        self.items.get(commodity).copied().unwrap_or(0)
    }

    /// Add the whole item or nothing.
    pub fn add(&mut self, item: &CargoItem) -> Result<(), CargoFull> {
        if item.quantity > self.free() {
            return Err(CargoFull {
                free: self.free(),
                needed: item.quantity,
            });
        }
        *self.items.entry(item.commodity.clone()).or_insert(0) += item.quantity;
        Ok(())
    }

    /// Remove up to `quantity` (selling, jettisoning). Returns the amount removed.
    pub fn remove(&mut self, commodity: &str, quantity: u32) -> u32 {
        let Some(have) = self.items.get_mut(commodity) else {
            return 0;
        };
        let taken = quantity.min(*have);
        *have -= taken;
        if *have == 0 {
            self.items.remove(commodity);
        }
        taken
    }

    /// Mark mission-linked cargo.
    pub fn reserve(&mut self, commodity: &str, quantity: u32) {
        *self.reserved.entry(commodity.to_string()).or_insert(0) += quantity;
    }

    pub fn release(&mut self, commodity: &str) {
        self.reserved.remove(commodity);
    }

    /// Remove whatever is left of the reserved quantity. Returns the amount taken.
    pub fn confiscate(&mut self, commodity: &str) -> u32 {
        let reserved = self.reserved.remove(commodity).unwrap_or(0);
        self.remove(commodity, reserved)
    }

    pub fn reserved(&self, commodity: &str) -> u32 {
        self.reserved.get(commodity).copied().unwrap_or(0)
    }

    pub fn items(&self) -> impl Iterator<Item = CargoItem> + '_ {
        self.items.iter().map(|(c, q)| CargoItem::new(c.clone(), *q))
    }
}

/// Credits and cargo of the player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commander {
    pub credits: u64,
    pub hold: CargoHold,
}

impl Commander {
    pub fn new(credits: u64, cargo_capacity: u32) -> Self {
        Self {
            credits,
            hold: CargoHold::new(cargo_capacity),
        }
    }

    /// Deduct a fine; the balance bottoms out at zero. Returns the amount charged.
    pub fn charge(&mut self, amount: u64) -> u64 {
        let charged = amount.min(self.credits);
        self.credits -= charged;
        charged
    }
}
