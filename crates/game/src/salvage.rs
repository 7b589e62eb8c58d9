//! Salvage dropped by destroyed ships, scooped by flying close.

use glam::Vec3;
use thiserror::Error;

use crate::cargo::{CargoFull, CargoHold, CargoItem};

/// Drift speed given to freshly spawned salvage.
const DRIFT_SPEED: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Salvage {
    pub id: u64,
    pub contents: CargoItem,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds until it despawns unscooped.
    pub remaining: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScoopError {
    #[error("nothing in scoop range")]
    NothingInRange,
    #[error(transparent)]
    CargoFull(#[from] CargoFull),
}

/// Floating salvage in the current system.
#[derive(Debug, Default)]
pub struct SalvageRegistry {
    items: Vec<Salvage>,
    next_id: u64,
}

impl SalvageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop salvage at a position. `drift` is a unit-ish direction it floats along.
    pub fn spawn(&mut self, contents: CargoItem, position: Vec3, drift: Vec3, lifetime: f32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Salvage {
            id,
            contents,
            position,
            velocity: drift.normalize_or_zero() * DRIFT_SPEED,
            remaining: lifetime,
        });
        id
    }

    pub fn update(&mut self, dt: f32) {
        for s in &mut self.items {
            s.position += s.velocity * dt;
            s.remaining -= dt;
        }
        self.items.retain(|s| s.remaining > 0.0);
    }

    /// Move the nearest salvage within `range` of `position` into the hold.
    /// A full hold leaves the salvage floating.
    pub fn try_scoop(
        &mut self,
        position: Vec3,
        range: f32,
        hold: &mut CargoHold,
    ) -> Result<CargoItem, ScoopError> {
        let nearest = self
            .items
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.position.distance(position)))
            .filter(|(_, d)| *d <= range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .ok_or(ScoopError::NothingInRange)?;

        hold.add(&self.items[nearest].contents)?;
        Ok(self.items.swap_remove(nearest).contents)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Salvage> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::SCRAP;

    #[test]
    fn salvage_drifts_and_expires() {
        let mut r = SalvageRegistry::new();
        r.spawn(CargoItem::new(SCRAP, 2), Vec3::ZERO, Vec3::X, 1.0);
        r.update(0.5);
        let s = r.iter().next().unwrap();
        assert!((s.position.x - 1.0).abs() < 1e-5);
        r.update(0.6);
        assert!(r.is_empty());
    }

    #[test]
    fn scoop_takes_nearest_in_range() {
        let mut r = SalvageRegistry::new();
        r.spawn(CargoItem::new(SCRAP, 1), Vec3::new(40.0, 0.0, 0.0), Vec3::ZERO, 60.0);
        r.spawn(CargoItem::new(SCRAP, 4), Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, 60.0);
        r.spawn(CargoItem::new(SCRAP, 2), Vec3::new(500.0, 0.0, 0.0), Vec3::ZERO, 60.0);
        let mut hold = CargoHold::new(10);
        let got = r.try_scoop(Vec3::ZERO, 50.0, &mut hold).unwrap();
        assert_eq!(got.quantity, 4);
        assert_eq!(hold.quantity(SCRAP), 4);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn scoop_with_full_hold_leaves_salvage() {
        let mut r = SalvageRegistry::new();
        r.spawn(CargoItem::new(SCRAP, 5), Vec3::ZERO, Vec3::ZERO, 60.0);
        let mut hold = CargoHold::new(3);
        let err = r.try_scoop(Vec3::ZERO, 10.0, &mut hold).unwrap_err();
        assert!(matches!(err, ScoopError::CargoFull(_)));
        assert_eq!(r.len(), 1);
        assert_eq!(
            r.try_scoop(Vec3::new(100.0, 0.0, 0.0), 10.0, &mut hold),
            Err(ScoopError::NothingInRange)
        );
    }
}
