//! Device-agnostic flight controls.
//!
//! The sim samples a [`ControlState`] once per tick: the set of held
//! controls plus the mouse offset from screen centre. [`KeyBindings`] maps
//! keyboard and mouse buttons onto controls.

use glam::Vec2;
use std::collections::{HashMap, HashSet};

/// A logical flight control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    ThrustForward,
    ThrustReverse,
    StrafeLeft,
    StrafeRight,
    StrafeUp,
    StrafeDown,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
    FireWeapons,
    ArmMissile,
    FireMissile,
    CycleTarget,
    ClearTarget,
    ToggleAssist,
    Scoop,
    Dock,
}

/// Mouse offsets inside this radius (normalised units) are ignored.
pub const MOUSE_DEADZONE: f32 = 0.05;

/// Manages control state for the current tick.
#[derive(Debug, Default, Clone)]
pub struct ControlState {
    /// Controls currently held down.
    held: HashSet<Control>,
    /// Controls pressed since the last `begin_frame`.
    pressed: HashSet<Control>,
    /// Mouse offset from screen centre, each axis in [-1, 1].
    mouse_offset: Vec2,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-tick edge state. Call after the sim has sampled the input.
    pub fn begin_frame(&mut self) {
        self.pressed.clear();
    }

    pub fn press(&mut self, control: Control) {
        if self.held.insert(control) {
            self.pressed.insert(control);
        }
    }

    pub fn release(&mut self, control: Control) {
        self.held.remove(&control);
    }

    pub fn set_mouse_offset(&mut self, offset: Vec2) {
        self.mouse_offset = offset.clamp(Vec2::splat(-1.0), Vec2::ONE);
    }

    /// Update the offset from a cursor position inside a window.
    pub fn process_cursor_position(&mut self, position: (f64, f64), window_size: (u32, u32)) {
        let (w, h) = (window_size.0.max(1) as f32, window_size.1.max(1) as f32);
        let x = (position.0 as f32 - w * 0.5) / (w * 0.5);
        let y = (position.1 as f32 - h * 0.5) / (h * 0.5);
        self.set_mouse_offset(Vec2::new(x, y));
    }

    pub fn is_held(&self, control: Control) -> bool {
        self.held.contains(&control)
    }

    pub fn is_pressed(&self, control: Control) -> bool {
        self.pressed.contains(&control)
    }

    /// Mouse offset with the deadzone applied.
    pub fn mouse_offset(&self) -> Vec2 {
        if self.mouse_offset.length() < MOUSE_DEADZONE {
            Vec2::ZERO
        } else {
            self.mouse_offset
        }
    }

    fn axis(&self, positive: Control, negative: Control) -> f32 {
        let mut value = 0.0;
        if self.is_held(positive) {
            value += 1.0;
        }
        if self.is_held(negative) {
            value -= 1.0;
        }
        value
    }

    /// Main engine input in [-0.5, 1]; reverse thrust is half power.
    pub fn thrust(&self) -> f32 {
        let t = self.axis(Control::ThrustForward, Control::ThrustReverse);
        if t < 0.0 {
            t * 0.5
        } else {
            t
        }
    }

    /// Strafe input: x = right, y = up.
    pub fn strafe(&self) -> Vec2 {
        Vec2::new(
            self.axis(Control::StrafeRight, Control::StrafeLeft),
            self.axis(Control::StrafeUp, Control::StrafeDown),
        )
    }

    /// Yaw from keys; positive turns right.
    pub fn yaw(&self) -> f32 {
        self.axis(Control::YawRight, Control::YawLeft)
    }

    /// Pitch from keys plus vertical mouse offset (mouse up raises the nose).
    pub fn pitch(&self) -> f32 {
        (self.axis(Control::PitchUp, Control::PitchDown) - self.mouse_offset().y).clamp(-1.0, 1.0)
    }

    /// Roll from keys plus horizontal mouse offset.
    pub fn roll(&self) -> f32 {
        (self.axis(Control::RollRight, Control::RollLeft) + self.mouse_offset().x).clamp(-1.0, 1.0)
    }
}

/// Physical input that can be bound to a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Key(KeyCode),
    Mouse(MouseButton),
}

/// Maps keys and mouse buttons to controls.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<Binding, Control>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use Control::*;
        let keys = [
            (KeyCode::KeyW, ThrustForward),
            (KeyCode::KeyS, ThrustReverse),
            (KeyCode::KeyA, StrafeLeft),
            (KeyCode::KeyD, StrafeRight),
            (KeyCode::KeyR, StrafeUp),
            (KeyCode::KeyF, StrafeDown),
            (KeyCode::ArrowLeft, YawLeft),
            (KeyCode::ArrowRight, YawRight),
            (KeyCode::ArrowUp, PitchUp),
            (KeyCode::ArrowDown, PitchDown),
            (KeyCode::KeyQ, RollLeft),
            (KeyCode::KeyE, RollRight),
            (KeyCode::Space, FireWeapons),
            (KeyCode::KeyM, ArmMissile),
            (KeyCode::KeyN, FireMissile),
            (KeyCode::KeyT, CycleTarget),
            (KeyCode::KeyY, ClearTarget),
            (KeyCode::KeyZ, ToggleAssist),
            (KeyCode::KeyG, Scoop),
            (KeyCode::KeyC, Dock),
        ];
        let mut map: HashMap<Binding, Control> =
            keys.into_iter().map(|(k, c)| (Binding::Key(k), c)).collect();
        map.insert(Binding::Mouse(MouseButton::Left), FireWeapons);
        map.insert(Binding::Mouse(MouseButton::Right), FireMissile);
        Self { map }
    }
}

impl KeyBindings {
    pub fn control_for(&self, binding: Binding) -> Option<Control> {
        self.map.get(&binding).copied()
    }

    /// Feed a keyboard event into the control state.
    pub fn process_keyboard(&self, state: &mut ControlState, key: KeyCode, element: ElementState) {
        self.process(state, Binding::Key(key), element);
    }

    /// Feed a mouse button event into the control state.
    pub fn process_mouse_button(
        &self,
        state: &mut ControlState,
        button: MouseButton,
        element: ElementState,
    ) {
        self.process(state, Binding::Mouse(button), element);
    }

    fn process(&self, state: &mut ControlState, binding: Binding, element: ElementState) {
        let Some(control) = self.control_for(binding) else {
            log::trace!("unbound input {:?}", binding);
            return;
        };
        match element {
            ElementState::Pressed => state.press(control),
            ElementState::Released => state.release(control),
        }
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;
