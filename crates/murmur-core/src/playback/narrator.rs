//! Two-lane speech driver.
//!
//! The narrator owns one [`Handoff`] per [`Lane`] and runs as a single tokio
//! task. Speak requests, pipeline callbacks and player notifications are all
//! applied from that task, so the handoffs never need locking.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::handoff::{Handoff, PlaybackEvent, PlaybackState, SessionId};
use super::player::PlayerFactory;
use crate::error::{Error, FailureKind, Result};
use crate::pipeline::Pipeline;
use crate::types::SynthesisRequest;
use crate::voice::Voice;

/// Independent speech slots of the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Summary,
    Answer,
}

/// Why a lane stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&Error> for LaneFailure {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Snapshot published to the host after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneStatus {
    pub state: PlaybackState,
    /// Fraction of units resolved for the current text
    pub progress: f32,
    pub failure: Option<LaneFailure>,
}

impl Default for LaneStatus {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            progress: 0.0,
            failure: None,
        }
    }
}

#[derive(Debug)]
pub enum Command {
    Speak { lane: Lane, text: String, voice: Voice },
    Stop { lane: Lane },
    StopAll,
}

/// Cloneable front end to a running narrator.
#[derive(Clone)]
pub struct NarratorHandle {
    commands: mpsc::UnboundedSender<Command>,
    summary: watch::Receiver<LaneStatus>,
    answer: watch::Receiver<LaneStatus>,
}

impl NarratorHandle {
    pub fn speak(&self, lane: Lane, text: impl Into<String>, voice: Voice) -> Result<()> {
        self.send(Command::Speak {
            lane,
            text: text.into(),
            voice,
        })
    }

    pub fn stop(&self, lane: Lane) -> Result<()> {
        self.send(Command::Stop { lane })
    }

    pub fn stop_all(&self) -> Result<()> {
        self.send(Command::StopAll)
    }

    pub fn status(&self, lane: Lane) -> watch::Receiver<LaneStatus> {
        match lane {
            Lane::Summary => self.summary.clone(),
            Lane::Answer => self.answer.clone(),
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::PlaybackStart("narrator has shut down".to_string()))
    }
}

struct LaneSlot {
    lane: Lane,
    handoff: Handoff,
    task: Option<JoinHandle<()>>,
    progress: f32,
    failure: Option<LaneFailure>,
    status: watch::Sender<LaneStatus>,
}

impl LaneSlot {
    fn new(
        lane: Lane,
        factory: Arc<dyn PlayerFactory>,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> (Self, watch::Receiver<LaneStatus>) {
        let (status, rx) = watch::channel(LaneStatus::default());
        let slot = Self {
            lane,
            handoff: Handoff::new(factory, events),
            task: None,
            progress: 0.0,
            failure: None,
            status,
        };
        (slot, rx)
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn stop(&mut self) {
        self.abort_task();
        self.handoff.stop();
    }

    fn publish(&self) {
        self.status.send_replace(LaneStatus {
            state: self.handoff.state(),
            progress: self.progress,
            failure: self.failure.clone(),
        });
    }
}

pub struct Narrator {
    pipeline: Arc<Pipeline>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    summary: LaneSlot,
    answer: LaneSlot,
}

impl Narrator {
    /// Start the narrator task on the current runtime.
    pub fn spawn(pipeline: Arc<Pipeline>, factory: Arc<dyn PlayerFactory>) -> NarratorHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let (summary, summary_rx) = LaneSlot::new(Lane::Summary, factory.clone(), events_tx.clone());
        let (answer, answer_rx) = LaneSlot::new(Lane::Answer, factory, events_tx.clone());

        let narrator = Self {
            pipeline,
            events: events_tx,
            summary,
            answer,
        };
        tokio::spawn(narrator.run(commands_rx, events_rx));

        NarratorHandle {
            commands: commands_tx,
            summary: summary_rx,
            answer: answer_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.on_event(event),
            }
        }

        debug!("Narrator handles dropped, stopping");
        self.summary.stop();
        self.answer.stop();
    }

    fn slot_mut(&mut self, lane: Lane) -> &mut LaneSlot {
        match lane {
            Lane::Summary => &mut self.summary,
            Lane::Answer => &mut self.answer,
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Speak { lane, text, voice } => {
                // Only one lane may be audible at a time.
                for slot in [&mut self.summary, &mut self.answer] {
                    slot.stop();
                    slot.publish();
                }

                let pipeline = self.pipeline.clone();
                let events = self.events.clone();
                let slot = self.slot_mut(lane);
                let session = slot.handoff.begin();
                slot.progress = 0.0;
                slot.failure = None;
                info!("Speaking {} chars on {:?} lane ({})", text.chars().count(), lane, session);
                slot.task = Some(tokio::spawn(synthesize(
                    pipeline, events, session, text, voice,
                )));
                slot.publish();
            }
            Command::Stop { lane } => {
                let slot = self.slot_mut(lane);
                slot.stop();
                slot.publish();
            }
            Command::StopAll => {
                for slot in [&mut self.summary, &mut self.answer] {
                    slot.stop();
                    slot.publish();
                }
            }
        }
    }

    fn on_event(&mut self, event: PlaybackEvent) {
        let session = event.session();
        let slot = if self.summary.handoff.session_id() == Some(session) {
            &mut self.summary
        } else if self.answer.handoff.session_id() == Some(session) {
            &mut self.answer
        } else {
            debug!("Dropping event for retired {}", session);
            return;
        };

        if let PlaybackEvent::Progress { fraction, .. } = &event {
            slot.progress = *fraction;
        }

        if let Err(e) = slot.handoff.handle(event) {
            warn!("{:?} lane failed: {}", slot.lane, e);
            slot.failure = Some(LaneFailure::from(&e));
        }
        if slot.handoff.state() == PlaybackState::Errored {
            slot.abort_task();
        }
        slot.publish();
    }
}

async fn synthesize(
    pipeline: Arc<Pipeline>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    session: SessionId,
    text: String,
    voice: Voice,
) {
    let request = SynthesisRequest::new(text, voice);
    let first = events.clone();
    let progress = events.clone();

    let outcome = pipeline
        .synthesize(
            &request,
            move |audio| {
                let _ = first.send(PlaybackEvent::FirstReady { session, audio });
            },
            move |fraction| {
                let _ = progress.send(PlaybackEvent::Progress { session, fraction });
            },
        )
        .await;

    let event = match outcome {
        Ok(audio) => PlaybackEvent::Completed { session, audio },
        Err(error) => PlaybackEvent::Failed { session, error },
    };
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{test_pipeline, ScriptedFetcher, LONG_TEXT};
    use crate::playback::handoff::tests::MockFactory;
    use crate::playback::PlayerRole;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    async fn wait_until(
        rx: &mut watch::Receiver<LaneStatus>,
        done: impl FnMut(&LaneStatus) -> bool,
    ) -> LaneStatus {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
            .await
            .expect("timed out waiting for lane status")
            .expect("narrator stopped")
            .clone()
    }

    async fn wait_for_state(
        rx: &mut watch::Receiver<LaneStatus>,
        state: PlaybackState,
    ) -> LaneStatus {
        wait_until(rx, |s| s.state == state).await
    }

    #[tokio::test]
    async fn test_speak_plays_preview_then_full() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let (pipeline, _dir) = test_pipeline(fetcher, 2);
        let factory = Arc::new(MockFactory::default());
        let narrator = Narrator::spawn(Arc::new(pipeline), factory.clone());
        let mut status = narrator.status(Lane::Summary);

        narrator.speak(Lane::Summary, LONG_TEXT, Voice::Alloy).unwrap();
        let transitioning = wait_for_state(&mut status, PlaybackState::Transitioning).await;
        assert_eq!(transitioning.progress, 1.0);

        factory.finish(PlayerRole::Preview);
        wait_for_state(&mut status, PlaybackState::FullPlaying).await;

        factory.finish(PlayerRole::Full);
        let done = wait_for_state(&mut status, PlaybackState::Idle).await;
        assert!(done.failure.is_none());
        assert_eq!(factory.count("preview:stop"), 0);
        assert_eq!(factory.count("full:stop"), 0);
    }

    #[tokio::test]
    async fn test_speaking_on_one_lane_silences_the_other() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let (pipeline, _dir) = test_pipeline(fetcher, 2);
        let factory = Arc::new(MockFactory::default());
        let narrator = Narrator::spawn(Arc::new(pipeline), factory.clone());
        let mut summary = narrator.status(Lane::Summary);
        let mut answer = narrator.status(Lane::Answer);

        narrator.speak(Lane::Summary, LONG_TEXT, Voice::Alloy).unwrap();
        wait_for_state(&mut summary, PlaybackState::Transitioning).await;

        narrator.speak(Lane::Answer, "Short answer.", Voice::Echo).unwrap();
        wait_until(&mut answer, |s| {
            matches!(
                s.state,
                PlaybackState::PreviewPlaying | PlaybackState::Transitioning
            )
        })
        .await;

        assert_eq!(summary.borrow().state, PlaybackState::Idle);
        assert_eq!(factory.count("preview:stop"), 1);
        assert_eq!(factory.count("full:stop"), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported_on_lane() {
        let fetcher = Arc::new(ScriptedFetcher {
            fail_at: Some(2),
            ..ScriptedFetcher::default()
        });
        let (pipeline, _dir) = test_pipeline(fetcher, 2);
        let factory = Arc::new(MockFactory::default());
        let narrator = Narrator::spawn(Arc::new(pipeline), factory.clone());
        let mut status = narrator.status(Lane::Answer);

        narrator.speak(Lane::Answer, LONG_TEXT, Voice::Alloy).unwrap();
        let errored = wait_for_state(&mut status, PlaybackState::Errored).await;

        let failure = errored.failure.expect("failure recorded");
        assert_eq!(failure.kind, FailureKind::Upstream);
        assert!(failure.message.contains("unit 2"));
        assert_eq!(factory.count("preview:stop"), 0);
    }

    #[tokio::test]
    async fn test_preview_start_failure_abandons_remaining_units() {
        let mut delays = vec![0u64];
        delays.extend(std::iter::repeat(50).take(20));
        let fetcher = Arc::new(ScriptedFetcher::with_delays(delays));
        let (pipeline, _dir) = test_pipeline(fetcher.clone(), 1);
        let n = pipeline.plan(LONG_TEXT).len();

        let factory = Arc::new(MockFactory {
            refuse_play: Some(PlayerRole::Preview),
            ..MockFactory::default()
        });
        let narrator = Narrator::spawn(Arc::new(pipeline), factory.clone());
        let mut status = narrator.status(Lane::Summary);

        narrator.speak(Lane::Summary, LONG_TEXT, Voice::Alloy).unwrap();
        let errored = wait_for_state(&mut status, PlaybackState::Errored).await;
        assert_eq!(errored.failure.map(|f| f.kind), Some(FailureKind::Playback));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(fetcher.calls.load(Ordering::SeqCst) < n);
        assert!(!factory.calls().iter().any(|c| c.starts_with("full:")));
    }
}
