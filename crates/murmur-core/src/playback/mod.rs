//! Preview/full playback coordination.

mod handoff;
mod narrator;
mod player;

pub use handoff::{Handoff, PlaybackEvent, PlaybackSession, PlaybackState, SessionId};
pub use narrator::{Command, Lane, LaneFailure, LaneStatus, Narrator, NarratorHandle};
pub use player::{FinishNotifier, Player, PlayerFactory, PlayerRole};
