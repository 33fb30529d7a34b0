//! Gapless preview-to-full playback handoff.
//!
//! State flow:
//!
//! ```text
//! Idle -> PreviewPlaying -> Transitioning -> FullPlaying -> Idle
//!              \________________________________^  (preview already done)
//! any -> Errored
//! ```
//!
//! The preview player is never stopped to make room for the full audio: the
//! full player is prepared while the preview runs and started from the
//! preview's own finish notification. The only explicit stop happens when a
//! caller starts a new session or stops this one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::player::{FinishNotifier, Player, PlayerFactory, PlayerRole};
use crate::error::{Error, Result};
use crate::types::AudioBlob;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Identifies one speak action; events from older sessions are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    PreviewPlaying,
    Transitioning,
    FullPlaying,
    Errored,
}

/// Everything that can drive a session forward.
#[derive(Debug)]
pub enum PlaybackEvent {
    /// Unit 0 audio is available
    FirstReady { session: SessionId, audio: AudioBlob },
    /// Fraction of units resolved so far
    Progress { session: SessionId, fraction: f32 },
    /// Complete audio is available
    Completed { session: SessionId, audio: AudioBlob },
    /// Synthesis failed
    Failed { session: SessionId, error: Error },
    /// A player reached the end of its audio on its own
    PlayerFinished {
        session: SessionId,
        role: PlayerRole,
        success: bool,
    },
}

impl PlaybackEvent {
    pub fn session(&self) -> SessionId {
        match self {
            PlaybackEvent::FirstReady { session, .. }
            | PlaybackEvent::Progress { session, .. }
            | PlaybackEvent::Completed { session, .. }
            | PlaybackEvent::Failed { session, .. }
            | PlaybackEvent::PlayerFinished { session, .. } => *session,
        }
    }
}

/// Players and progress of the current speak action.
pub struct PlaybackSession {
    id: SessionId,
    preview: Option<Box<dyn Player>>,
    full: Option<Box<dyn Player>>,
    state: PlaybackState,
    pending_handoff: bool,
    preview_finished: bool,
}

impl PlaybackSession {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            preview: None,
            full: None,
            state: PlaybackState::Idle,
            pending_handoff: false,
            preview_finished: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn pending_handoff(&self) -> bool {
        self.pending_handoff
    }

    fn release_players(&mut self) {
        self.preview = None;
        self.full = None;
        self.pending_handoff = false;
    }

    fn stop_players(&mut self) {
        if let Some(player) = self.preview.as_mut() {
            player.stop();
        }
        if let Some(player) = self.full.as_mut() {
            player.stop();
        }
        self.release_players();
    }
}

/// Reusable handoff state machine; one instance per independent speech lane.
pub struct Handoff {
    factory: Arc<dyn PlayerFactory>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    session: Option<PlaybackSession>,
}

impl Handoff {
    pub fn new(
        factory: Arc<dyn PlayerFactory>,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        Self {
            factory,
            events,
            session: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Whether any player of the current session is still producing sound.
    pub fn is_playing(&self) -> bool {
        matches!(
            self.state(),
            PlaybackState::PreviewPlaying | PlaybackState::Transitioning | PlaybackState::FullPlaying
        )
    }

    /// Start a new session, force-stopping whatever the old one was playing.
    pub fn begin(&mut self) -> SessionId {
        self.stop();
        let id = SessionId::next();
        debug!("Starting playback {}", id);
        self.session = Some(PlaybackSession::new(id));
        id
    }

    /// Force-stop the current session; later events for it are ignored.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!("Stopping playback {} in {:?}", session.id, session.state);
            session.stop_players();
        }
    }

    /// Apply one event. Errors are playback-start or synthesis failures,
    /// reported after the session has moved to `Errored`.
    pub fn handle(&mut self, event: PlaybackEvent) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            debug!("Ignoring {:?} with no active session", event.session());
            return Ok(());
        };
        if event.session() != session.id {
            debug!("Ignoring stale event for {}", event.session());
            return Ok(());
        }
        if session.state == PlaybackState::Errored {
            return Ok(());
        }

        match event {
            PlaybackEvent::FirstReady { audio, .. } => self.on_first_ready(audio),
            PlaybackEvent::Progress { .. } => Ok(()),
            PlaybackEvent::Completed { audio, .. } => self.on_completed(audio),
            PlaybackEvent::Failed { error, .. } => {
                self.fail();
                Err(error)
            }
            PlaybackEvent::PlayerFinished { role, success, .. } => {
                if !success {
                    warn!("{} player finished unsuccessfully", role);
                }
                match role {
                    PlayerRole::Preview => self.on_preview_finished(),
                    PlayerRole::Full => {
                        self.on_full_finished();
                        Ok(())
                    }
                }
            }
        }
    }

    fn on_first_ready(&mut self, audio: AudioBlob) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.state != PlaybackState::Idle {
            warn!("Duplicate first-ready for {}", session.id);
            return Ok(());
        }

        let id = session.id;
        let notifier = FinishNotifier::new(id, PlayerRole::Preview, self.events.clone());
        let player = self
            .factory
            .create(audio, notifier)
            .and_then(|mut player| {
                if !player.prepare() {
                    warn!("Preview player could not pre-buffer for {}", id);
                }
                if player.play() {
                    Ok(player)
                } else {
                    Err(Error::PlaybackStart("preview player refused to play".into()))
                }
            });

        match player {
            Ok(player) => {
                session.preview = Some(player);
                session.state = PlaybackState::PreviewPlaying;
                info!("Preview playing for {}", session.id);
                Ok(())
            }
            Err(e) => {
                self.fail();
                Err(as_playback_error(e))
            }
        }
    }

    fn on_completed(&mut self, audio: AudioBlob) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let notifier = FinishNotifier::new(session.id, PlayerRole::Full, self.events.clone());
        let mut player = match self.factory.create(audio, notifier) {
            Ok(player) => player,
            Err(e) => {
                self.fail();
                return Err(as_playback_error(e));
            }
        };
        if !player.prepare() {
            warn!("Full player could not pre-buffer for {}", session.id);
        }

        let preview_still_playing =
            session.state == PlaybackState::PreviewPlaying && !session.preview_finished;
        session.full = Some(player);

        if preview_still_playing {
            session.pending_handoff = true;
            session.state = PlaybackState::Transitioning;
            debug!("Full audio buffered for {}, waiting for preview", session.id);
            Ok(())
        } else {
            self.start_full()
        }
    }

    fn on_preview_finished(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.preview_finished = true;
        session.preview = None;

        if session.state == PlaybackState::Transitioning && session.pending_handoff {
            self.start_full()
        } else {
            debug!("Preview finished for {} before full audio", session.id);
            Ok(())
        }
    }

    fn on_full_finished(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.state == PlaybackState::FullPlaying {
                info!("Playback finished for {}", session.id);
                session.release_players();
                session.state = PlaybackState::Idle;
            }
        }
    }

    fn start_full(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.pending_handoff = false;

        let started = session.full.as_mut().map(|p| p.play()).unwrap_or(false);
        if started {
            session.state = PlaybackState::FullPlaying;
            info!("Full audio playing for {}", session.id);
            Ok(())
        } else {
            self.fail();
            Err(Error::PlaybackStart("full player refused to play".into()))
        }
    }

    /// Enter `Errored`, dropping players without stopping them.
    fn fail(&mut self) {
        if let Some(session) = self.session.as_mut() {
            warn!("Playback {} errored in {:?}", session.id, session.state);
            session.release_players();
            session.state = PlaybackState::Errored;
        }
    }
}

fn as_playback_error(e: Error) -> Error {
    match e {
        Error::PlaybackStart(_) => e,
        other => Error::PlaybackStart(other.to_string()),
    }
}
