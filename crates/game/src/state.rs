//! Session phase and the player-facing message log.

/// Overall state of a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    /// Player ship destroyed. Terminal.
    Destroyed,
    /// Session torn down; nothing left to simulate.
    Ended,
}

/// Severity of a message, for colouring by the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameMessage {
    pub text: String,
    pub level: MessageLevel,
    pub time_remaining: f32,
}

/// Messages shown to the player, expired over time.
#[derive(Debug, Clone)]
pub struct GameMessages {
    pub messages: Vec<GameMessage>,
    default_duration: f32,
}

impl Default for GameMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMessages {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            default_duration: 4.0,
        }
    }

    /// Push a message unless the same text is still on screen.
    pub fn push(&mut self, text: impl Into<String>, level: MessageLevel) {
        let text = text.into();
        if self.messages.iter().any(|m| m.text == text) {
            return;
        }
        log::debug!("message: {}", text);
        self.messages.push(GameMessage {
            text,
            level,
            time_remaining: self.default_duration,
        });
        if self.messages.len() > 20 {
            self.messages.remove(0);
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(text, MessageLevel::Info);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(text, MessageLevel::Success);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(text, MessageLevel::Warning);
    }

    pub fn update(&mut self, dt: f32) {
        for msg in &mut self.messages {
            msg.time_remaining -= dt;
        }
        self.messages.retain(|m| m.time_remaining > 0.0);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_dedupe_while_visible() {
        let mut m = GameMessages::new();
        m.warning("Insufficient energy");
        m.warning("Insufficient energy");
        assert_eq!(m.messages.len(), 1);
        m.update(5.0);
        assert!(m.messages.is_empty());
        m.warning("Insufficient energy");
        assert_eq!(m.messages.len(), 1);
    }
}
