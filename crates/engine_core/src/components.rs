//! Common ECS components used across the sim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hull and shield state of a ship.
///
/// Invariants: `0 <= hull <= max_hull`, `0 <= shields <= max_shields`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hull: f32,
    pub max_hull: f32,
    pub shields: f32,
    pub max_shields: f32,
    /// Shield points restored per second.
    pub shield_regen: f32,
}

/// What a single hit did to a ship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageReport {
    pub shield_damage: f32,
    pub hull_damage: f32,
    pub destroyed: bool,
}

impl Vitals {
    pub fn new(max_hull: f32, max_shields: f32, shield_regen: f32) -> Self {
        Self {
            hull: max_hull,
            max_hull,
            shields: max_shields,
            max_shields,
            shield_regen,
        }
    }

    /// Shields soak damage first, the remainder goes to the hull.
    pub fn apply_damage(&mut self, damage: f32) -> DamageReport {
        let damage = damage.max(0.0);
        let shield_damage = self.shields.min(damage);
        self.shields -= shield_damage;
        let spill = damage - shield_damage;
        let hull_damage = spill.min(self.hull);
        self.hull = (self.hull - spill).max(0.0);
        DamageReport {
            shield_damage,
            hull_damage,
            destroyed: self.is_destroyed(),
        }
    }

    pub fn recharge(&mut self, dt: f32) {
        if self.is_destroyed() {
            return;
        }
        self.shields = (self.shields + self.shield_regen * dt).min(self.max_shields);
    }

    pub fn is_destroyed(&self) -> bool {
        self.hull <= 0.0
    }

    pub fn hull_fraction(&self) -> f32 {
        if self.max_hull > 0.0 {
            self.hull / self.max_hull
        } else {
            0.0
        }
    }
}

/// Not enough energy in the capacitor for the requested draw.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("insufficient energy: need {needed:.0}, have {available:.0}")]
pub struct InsufficientEnergy {
    pub needed: f32,
    pub available: f32,
}

/// Ship capacitor feeding weapons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyPool {
    pub current: f32,
    pub max: f32,
    /// Energy restored per second.
    pub recharge_rate: f32,
}

impl EnergyPool {
    pub fn new(max: f32, recharge_rate: f32) -> Self {
        Self {
            current: max,
            max,
            recharge_rate,
        }
    }

    /// Debit `amount` if it is fully available; otherwise leave the pool untouched.
    pub fn try_spend(&mut self, amount: f32) -> Result<(), InsufficientEnergy> {
        if amount > self.current {
            return Err(InsufficientEnergy {
                needed: amount,
                available: self.current,
            });
        }
        self.current -= amount;
        Ok(())
    }

    pub fn recharge(&mut self, dt: f32) {
        self.current = (self.current + self.recharge_rate * dt).min(self.max);
    }
}

/// Lifetime component for temporary entities (projectiles, effects, salvage).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Lifetime {
    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    /// Tick down; returns true once expired.
    pub fn update(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vitals_shields_absorb_then_hull() {
        let mut v = Vitals::new(100.0, 30.0, 0.0);
        let report = v.apply_damage(50.0);
        assert_eq!(v.shields, 0.0);
        assert_eq!(v.hull, 80.0);
        assert_eq!(report.shield_damage, 30.0);
        assert_eq!(report.hull_damage, 20.0);
        assert!(!report.destroyed);
    }

    #[test]
    fn vitals_damage_formula_holds_across_inputs() {
        for &(shields, hull, damage) in &[
            (0.0, 100.0, 10.0),
            (50.0, 100.0, 10.0),
            (10.0, 40.0, 10.0),
            (25.0, 60.0, 70.0),
        ] {
            let mut v = Vitals::new(100.0, 50.0, 0.0);
            v.shields = shields;
            v.hull = hull;
            v.apply_damage(damage);
            assert_eq!(v.shields, (shields - damage).max(0.0));
            assert_eq!(v.hull, hull - (damage - shields).max(0.0));
        }
    }

    #[test]
    fn vitals_hull_clamped_at_zero() {
        let mut v = Vitals::new(20.0, 0.0, 0.0);
        let report = v.apply_damage(500.0);
        assert_eq!(v.hull, 0.0);
        assert_eq!(report.hull_damage, 20.0);
        assert!(report.destroyed);
    }

    #[test]
    fn vitals_recharge_stops_when_destroyed() {
        let mut v = Vitals::new(10.0, 10.0, 5.0);
        v.shields = 0.0;
        v.recharge(1.0);
        assert_eq!(v.shields, 5.0);
        v.recharge(10.0);
        assert_eq!(v.shields, 10.0);
        v.hull = 0.0;
        v.shields = 0.0;
        v.recharge(1.0);
        assert_eq!(v.shields, 0.0);
    }

    #[test]
    fn energy_try_spend_is_all_or_nothing() {
        let mut e = EnergyPool::new(10.0, 1.0);
        assert!(e.try_spend(4.0).is_ok());
        assert_eq!(e.current, 6.0);
        let err = e.try_spend(7.0).unwrap_err();
        assert_eq!(err.needed, 7.0);
        assert_eq!(e.current, 6.0);
    }

    #[test]
    fn lifetime_expires() {
        let mut l = Lifetime::new(0.5);
        assert!(!l.update(0.25));
        assert!(l.update(0.25));
    }
}
