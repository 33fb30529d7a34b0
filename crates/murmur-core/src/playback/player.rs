//! Minimal audio output capability consumed by the handoff.

use std::fmt;
use tokio::sync::mpsc;

use super::handoff::{PlaybackEvent, SessionId};
use crate::error::Result;
use crate::types::AudioBlob;

/// Which of the two players in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerRole {
    /// Plays unit 0 alone
    Preview,
    /// Plays the complete reassembled audio
    Full,
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerRole::Preview => f.write_str("preview"),
            PlayerRole::Full => f.write_str("full"),
        }
    }
}

/// One decoded audio stream bound to an output.
pub trait Player: Send {
    /// Decode and buffer without starting output.
    fn prepare(&mut self) -> bool;

    /// Start output; false if the player refused.
    fn play(&mut self) -> bool;

    /// Halt output immediately.
    fn stop(&mut self);
}

/// Builds players for encoded audio.
///
/// The player must call [`FinishNotifier::finished`] when output ends on its
/// own. It must not call it in response to [`Player::stop`].
pub trait PlayerFactory: Send + Sync {
    fn create(&self, audio: AudioBlob, on_finished: FinishNotifier) -> Result<Box<dyn Player>>;
}

/// Delivers a player's natural end of output back to its session.
#[derive(Clone)]
pub struct FinishNotifier {
    session: SessionId,
    role: PlayerRole,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl FinishNotifier {
    pub(crate) fn new(
        session: SessionId,
        role: PlayerRole,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        Self {
            session,
            role,
            events,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn role(&self) -> PlayerRole {
        self.role
    }

    pub fn finished(&self, success: bool) {
        // A closed channel means nobody is listening any more.
        let _ = self.events.send(PlaybackEvent::PlayerFinished {
            session: self.session,
            role: self.role,
            success,
        });
    }
}

impl fmt::Debug for FinishNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishNotifier")
            .field("session", &self.session)
            .field("role", &self.role)
            .finish()
    }
}
