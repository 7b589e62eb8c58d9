//! Contract tracking: one active mission advanced by kills and docking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cargo::Commander;
use crate::ship::NpcRole;

/// Star system identifier.
pub type SystemId = u32;

/// Fraction of the reward charged when a mission is abandoned.
pub const ABANDON_FINE_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionKind {
    /// Kill `required` NPCs of `role` in the target system.
    Bounty { role: NpcRole, required: u32, kills: u32 },
    /// Carry cargo to the target system. Must be in the hold at acceptance.
    Delivery { commodity: String, quantity: u32 },
    /// Destroy the NPC with this name.
    Assassination { target_name: String },
}

impl MissionKind {
    pub fn name(&self) -> &'static str {
        match self {
            MissionKind::Bounty { .. } => "Bounty",
            MissionKind::Delivery { .. } => "Delivery",
            MissionKind::Assassination { .. } => "Assassination",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    Available,
    InProgress,
    /// Objective met, awaiting payout.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: u64,
    pub kind: MissionKind,
    pub status: MissionStatus,
    pub reward: u64,
    /// Where the contract was taken. Bounty and assassination payouts happen here.
    pub issuer: SystemId,
    /// Where kills count, or the delivery destination.
    pub target_system: SystemId,
}

impl Mission {
    pub fn bounty(
        id: u64,
        role: NpcRole,
        required: u32,
        reward: u64,
        issuer: SystemId,
        target_system: SystemId,
    ) -> Self {
        Self::new(
            id,
            MissionKind::Bounty {
                role,
                required,
                kills: 0,
            },
            reward,
            issuer,
            target_system,
        )
    }

    pub fn delivery(
        id: u64,
        commodity: impl Into<String>,
        quantity: u32,
        reward: u64,
        issuer: SystemId,
        destination: SystemId,
    ) -> Self {
        Self::new(
            id,
            MissionKind::Delivery {
                commodity: commodity.into(),
                quantity,
            },
            reward,
            issuer,
            destination,
        )
    }

    pub fn assassination(
        id: u64,
        target_name: impl Into<String>,
        reward: u64,
        issuer: SystemId,
        target_system: SystemId,
    ) -> Self {
        Self::new(
            id,
            MissionKind::Assassination {
                target_name: target_name.into(),
            },
            reward,
            issuer,
            target_system,
        )
    }

    fn new(
        id: u64,
        kind: MissionKind,
        reward: u64,
        issuer: SystemId,
        target_system: SystemId,
    ) -> Self {
        Self {
            id,
            kind,
            status: MissionStatus::Available,
            reward,
            issuer,
            target_system,
        }
    }

    /// One-line summary for the HUD.
    pub fn describe(&self) -> String {
        match &self.kind {
            MissionKind::Bounty {
                role,
                required,
                kills,
            } => format!(
                "Bounty: {:?} x{} in system {} ({}/{})",
                role, required, self.target_system, kills, required
            ),
            MissionKind::Delivery {
                commodity,
                quantity,
            } => format!(
                "Delivery: {} x{} to system {}",
                commodity, quantity, self.target_system
            ),
            MissionKind::Assassination { target_name } => {
                format!("Assassinate {} in system {}", target_name, self.target_system)
            }
        }
    }
}

/// An NPC destruction as seen by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct KillReport {
    pub name: String,
    pub role: NpcRole,
    pub system: SystemId,
    pub by_player: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionProgress {
    KillCounted { kills: u32, required: u32 },
    Completed,
}

/// Result of docking with respect to the active mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockOutcome {
    /// Nothing to settle here.
    NoChange,
    Paid { mission: u64, reward: u64 },
    /// At the delivery destination without the full quantity.
    Shortfall { commodity: String, needed: u32, held: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonReport {
    pub fine: u64,
    pub confiscated: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissionError {
    #[error("a mission is already active")]
    AlreadyActive,
    #[error("no mission {0} on offer")]
    NotOffered(u64),
    #[error("need {needed} {commodity} aboard, have {held}")]
    MissingCargo {
        commodity: String,
        needed: u32,
        held: u32,
    },
    #[error("no active mission")]
    NoActiveMission,
    #[error("mission {0} is complete, dock to collect the reward")]
    AlreadyCompleted(u64),
}

/// Mission board plus the single active contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionTracker {
    offers: Vec<Mission>,
    active: Option<Mission>,
}

impl MissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a generated mission on the board.
    pub fn offer(&mut self, mut mission: Mission) {
        mission.status = MissionStatus::Available;
        self.offers.push(mission);
    }

    pub fn offers(&self) -> &[Mission] {
        &self.offers
    }

    pub fn active(&self) -> Option<&Mission> {
        self.active.as_ref()
    }

    /// Take a mission off the board. Delivery cargo is reserved immediately.
    pub fn accept(&mut self, id: u64, commander: &mut Commander) -> Result<&Mission, MissionError> {
        if self.active.is_some() {
            return Err(MissionError::AlreadyActive);
        }
        let index = self
            .offers
            .iter()
            .position(|m| m.id == id)
            .ok_or(MissionError::NotOffered(id))?;

        if let MissionKind::Delivery {
            commodity,
            quantity,
        } = &self.offers[index].kind
        {
            let held = commander.hold.quantity(commodity);
            if held < *quantity {
                return Err(MissionError::MissingCargo {
                    commodity: commodity.clone(),
                    needed: *quantity,
                    held,
                });
            }
            commander.hold.reserve(commodity, *quantity);
        }

        let mut mission = self.offers.remove(index);
        mission.status = MissionStatus::InProgress;
        log::info!("accepted mission {}: {}", mission.id, mission.describe());
        Ok(self.active.insert(mission))
    }

    /// Feed an NPC destruction to the active mission.
    pub fn record_kill(&mut self, kill: &KillReport) -> Option<MissionProgress> {
        let mission = self.active.as_mut()?;
        if mission.status != MissionStatus::InProgress || kill.system != mission.target_system {
            return None;
        }
        let progress = match &mut mission.kind {
            MissionKind::Bounty {
                role,
                required,
                kills,
            } => {
                if !kill.by_player || kill.role != *role {
                    return None;
                }
                *kills += 1;
                if *kills >= *required {
                    MissionProgress::Completed
                } else {
                    MissionProgress::KillCounted {
                        kills: *kills,
                        required: *required,
                    }
                }
            }
            MissionKind::Assassination { target_name } if *target_name == kill.name => {
                MissionProgress::Completed
            }
            MissionKind::Assassination { .. } | MissionKind::Delivery { .. } => return None,
        };
        if progress == MissionProgress::Completed {
            mission.status = MissionStatus::Completed;
            log::info!("mission {} completed", mission.id);
        }
        Some(progress)
    }

    /// Settle the active mission on docking in `system`.
    pub fn dock(&mut self, system: SystemId, commander: &mut Commander) -> DockOutcome {
        let Some(mission) = self.active.as_mut() else {
            return DockOutcome::NoChange;
        };

        match (&mission.kind, mission.status) {
            (
                MissionKind::Delivery {
                    commodity,
                    quantity,
                },
                MissionStatus::InProgress,
            ) if system == mission.target_system => {
                let held = commander.hold.quantity(commodity);
                if held < *quantity {
                    return DockOutcome::Shortfall {
                        commodity: commodity.clone(),
                        needed: *quantity,
                        held,
                    };
                }
                commander.hold.release(commodity);
                commander.hold.remove(commodity, *quantity);
                mission.status = MissionStatus::Completed;
            }
            (MissionKind::Bounty { .. } | MissionKind::Assassination { .. }, MissionStatus::Completed)
                if system == mission.issuer => {}
            _ => return DockOutcome::NoChange,
        }

        let id = mission.id;
        let reward = mission.reward;
        commander.credits += reward;
        self.active = None;
        log::info!("mission {} paid {} cr", id, reward);
        DockOutcome::Paid {
            mission: id,
            reward,
        }
    }

    /// Drop the in-progress mission: fine 10% of the reward and confiscate linked cargo.
    pub fn abandon(&mut self, commander: &mut Commander) -> Result<AbandonReport, MissionError> {
        match &self.active {
            None => return Err(MissionError::NoActiveMission),
            Some(m) if m.status == MissionStatus::Completed => {
                return Err(MissionError::AlreadyCompleted(m.id))
            }
            Some(_) => {}
        }
        let mission = self.active.take().ok_or(MissionError::NoActiveMission)?;
        let fine = (mission.reward as f64 * ABANDON_FINE_FRACTION).round() as u64;
        let fine = commander.charge(fine);
        let confiscated = match &mission.kind {
            MissionKind::Delivery { commodity, .. } => commander.hold.confiscate(commodity),
            MissionKind::Bounty { .. } | MissionKind::Assassination { .. } => 0,
        };
        log::info!(
            "mission {} abandoned: fined {} cr, {} units confiscated",
            mission.id,
            fine,
            confiscated
        );
        Ok(AbandonReport { fine, confiscated })
    }

    pub fn clear(&mut self) {
        self.offers.clear();
        self.active = None;
    }
}
