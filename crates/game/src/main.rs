//! Voidtrader headless runner: flies a scripted sortie against the configured
//! encounter and logs what happened.

use anyhow::{Context, Result};
use game::mission::Mission;
use game::ship::NpcRole;
use game::{GamePhase, Session, SimConfig};
use input::{ControlState, ElementState, KeyBindings, KeyCode};
use std::path::PathBuf;

/// Fixed frame dt the script runs at.
const FRAME_DT: f32 = 1.0 / 60.0;
const DEFAULT_FRAMES: u64 = 3600;
const SUMMARY_EVERY: u64 = 300;

/// Key events for one frame of the sortie.
fn script(frame: u64) -> Vec<(KeyCode, ElementState)> {
    use ElementState::{Pressed, Released};
    match frame {
        0 => vec![(KeyCode::KeyT, Pressed), (KeyCode::KeyG, Pressed)],
        1 => vec![(KeyCode::KeyT, Released), (KeyCode::KeyM, Pressed)],
        2 => vec![(KeyCode::KeyM, Released), (KeyCode::KeyW, Pressed)],
        240 => vec![(KeyCode::KeyW, Released), (KeyCode::Space, Pressed)],
        300 => vec![(KeyCode::KeyN, Pressed)],
        301 => vec![(KeyCode::KeyN, Released)],
        1500 => vec![(KeyCode::Space, Released), (KeyCode::KeyZ, Pressed)],
        1501 => vec![(KeyCode::KeyZ, Released), (KeyCode::KeyS, Pressed)],
        3000 => vec![(KeyCode::KeyS, Released), (KeyCode::KeyC, Pressed)],
        3001 => vec![(KeyCode::KeyC, Released)],
        _ => Vec::new(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let frames = match args.next() {
        Some(arg) => arg
            .parse::<u64>()
            .with_context(|| format!("invalid frame count '{}'", arg))?,
        None => DEFAULT_FRAMES,
    };
    let save_path = args.next().map(PathBuf::from);

    log::info!("Starting Voidtrader headless sortie ({} frames)", frames);

    let config = SimConfig::load_or_create();
    let catalog = config.catalog();
    let system = config.start_system;
    let mut session = Session::new(config, catalog).context("building session")?;

    session.offer_mission(Mission::bounty(1, NpcRole::Pirate, 1, 250, system, system));
    if let Err(e) = session.accept_mission(1) {
        log::warn!("could not accept bounty: {}", e);
    }

    let bindings = KeyBindings::default();
    let mut controls = ControlState::new();

    for frame in 0..frames {
        for (key, state) in script(frame) {
            bindings.process_keyboard(&mut controls, key, state);
        }
        let snap = session.tick(&controls, FRAME_DT);
        controls.begin_frame();

        if frame % SUMMARY_EVERY == 0 {
            if let Some(player) = &snap.player {
                log::info!(
                    "t={:.1}s hull {:.0}/{:.0} shields {:.0} energy {:.0} speed {:.1} npcs {} shots {}",
                    snap.elapsed,
                    player.ship.vitals.hull,
                    player.ship.vitals.max_hull,
                    player.ship.vitals.shields,
                    player.ship.energy,
                    player.ship.velocity.length(),
                    snap.npcs.len(),
                    snap.projectiles.len()
                );
            }
        }
        if snap.phase != GamePhase::Playing {
            log::info!("sortie ended at frame {}: {:?}", frame, snap.phase);
            break;
        }
    }

    let snap = session.snapshot();
    for message in &snap.messages {
        log::info!("[{:?}] {}", message.level, message.text);
    }
    log::info!(
        "final: {:?}, {} cr, {} salvage floating, mission {}",
        snap.phase,
        snap.credits,
        snap.salvage.len(),
        snap.mission
            .as_ref()
            .map_or_else(|| "none".to_string(), |m| m.describe())
    );
    for item in session.commander().hold.items() {
        log::info!("hold: {} x{}", item.commodity, item.quantity);
    }

    if let Some(path) = save_path {
        match session.save() {
            Some(save) => {
                save.save(&path)?;
                log::info!("saved to {:?}", path);
            }
            None => log::warn!("player ship lost, nothing to save"),
        }
    }

    session.teardown();
    Ok(())
}
