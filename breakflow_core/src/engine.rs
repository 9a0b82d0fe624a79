//! Phase engine: work/break cycling, exercise rotation and interrupts.
//!
//! The engine is a plain struct owned by a long-lived host. It never
//! schedules anything itself; the host calls [`BreakEngine::tick`] from one
//! stable loop (every 500ms or less) and forwards user commands between
//! ticks. All timing state lives here, so a UI can be torn down and rebuilt
//! at will without disturbing a countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Work -> Break -> Work -> ... -> Stopped -> Idle
//! ```

use crate::break_session::{AdvanceCause, BreakSession};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, SessionSettings};
use crate::countdown::{Countdown, Tick};
use crate::media::{ConsumerId, FeedbackFeed, MediaBroker, MediaError, MediaEvent, MediaSource};
use crate::rotator::{ExerciseCursor, ExerciseRotator};
use crate::{
    Catalog, EngineState, Error, Exercise, Phase, Result, Session, SessionSummary, Snapshot,
};
use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, Sender};
use uuid::Uuid;

/// Tunables that do not change during a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub exercise_secs: u64,
    pub camera_enabled: bool,
    pub feedback_interval_secs: u64,
    pub feedback_history: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            exercise_secs: 60,
            camera_enabled: true,
            feedback_interval_secs: 4,
            feedback_history: 3,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            exercise_secs: config.exercises.duration_seconds,
            camera_enabled: config.camera.enabled,
            feedback_interval_secs: config.camera.feedback_interval_seconds,
            feedback_history: config.camera.feedback_history,
        }
    }
}

/// What caused a phase to be entered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    Start,
    Expired,
    Skipped,
}

/// Something observable that happened inside the engine
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    PhaseEntered {
        phase: Phase,
        session_count: u32,
        duration_secs: u64,
        cause: TransitionCause,
    },
    ExerciseAdvanced {
        local_index: u64,
        exercise_id: String,
        cause: AdvanceCause,
    },
    RestEntered,
    CheckpointToggled {
        label: String,
        checked: bool,
    },
    CameraOnline,
    CameraUnavailable {
        error: MediaError,
    },
    CameraEnded,
    Feedback {
        message: String,
    },
    Stopped {
        summary: SessionSummary,
    },
    Restarted,
}

/// The phase state machine
pub struct BreakEngine<C: Clock = SystemClock> {
    clock: C,
    rotator: ExerciseRotator,
    options: EngineOptions,
    media: MediaBroker,
    state: EngineState,
    settings: Option<SessionSettings>,
    session: Option<Session>,
    global_exercise_index: u64,
    /// The one countdown for the active phase
    countdown: Countdown,
    break_session: Option<BreakSession>,
    exercises_done: u64,
    subscribers: Vec<Sender<Snapshot>>,
}

impl<C: Clock> BreakEngine<C> {
    pub fn new(
        clock: C,
        catalog: Catalog,
        media_source: Box<dyn MediaSource>,
        options: EngineOptions,
    ) -> Result<Self> {
        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }
        debug_assert!(options.exercise_secs > 0, "exercise duration must be positive");

        let feed = FeedbackFeed::new(options.feedback_interval_secs, options.feedback_history);
        Ok(Self {
            clock,
            rotator: ExerciseRotator::new(catalog)?,
            media: MediaBroker::new(media_source, feed),
            options,
            state: EngineState::Idle,
            settings: None,
            session: None,
            global_exercise_index: 0,
            countdown: Countdown::new(),
            break_session: None,
            exercises_done: 0,
            subscribers: Vec::new(),
        })
    }

    /// Build an engine from the loaded configuration
    pub fn from_config(clock: C, config: &Config, media_source: Box<dyn MediaSource>) -> Result<Self> {
        Self::new(
            clock,
            config.catalog(),
            media_source,
            EngineOptions::from_config(config),
        )
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 0 before the first start and after a restart
    pub fn session_count(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.session_count)
    }

    pub fn global_exercise_index(&self) -> u64 {
        self.global_exercise_index
    }

    pub fn catalog(&self) -> &Catalog {
        self.rotator.catalog()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn media(&self) -> &MediaBroker {
        &self.media
    }

    /// Exercise on screen; only defined during a break
    pub fn current_exercise(&self) -> Option<&Exercise> {
        let break_session = self.break_session.as_ref()?;
        let cursor = ExerciseCursor::new(self.global_exercise_index, break_session.local());
        Some(self.rotator.current(cursor))
    }

    /// True while any countdown, feed or capture is still live
    pub fn has_pending_callbacks(&self) -> bool {
        self.countdown.is_armed()
            || self
                .break_session
                .as_ref()
                .is_some_and(|b| b.has_pending_countdown())
            || self.media.has_pending_feedback()
            || self.media.is_online()
    }

    /// Build the read-only projection
    pub fn snapshot(&self) -> Snapshot {
        let phase = self.state.phase();
        let break_session = self.break_session.as_ref();
        let (remaining_secs, total_secs) = if phase.is_some() {
            (self.countdown.remaining_secs(), self.countdown.duration_secs())
        } else {
            (0, 0)
        };

        Snapshot {
            state: self.state,
            phase,
            user_name: self.settings.as_ref().map(|s| s.user_name.clone()),
            remaining_secs,
            total_secs,
            session_count: self.session_count(),
            global_exercise_index: self.global_exercise_index,
            local_exercise_index: break_session.map_or(0, |b| b.local()),
            current_exercise: self.current_exercise().cloned(),
            exercise_remaining_secs: break_session.and_then(|b| b.exercise_remaining_secs()),
            planned_exercises: break_session.map(|_| {
                self.rotator
                    .planned_for(self.countdown.duration_secs(), self.options.exercise_secs)
            }),
            checked_checkpoints: break_session.map_or_else(Vec::new, |b| b.checked().to_vec()),
            rest_mode: break_session.is_some_and(|b| b.rest_mode()),
            camera_online: self.media.is_online(),
            feedback: self.media.feedback(),
            at: self.clock.now(),
        }
    }

    /// Totals for the current (or just stopped) run
    pub fn summary(&self) -> Option<SessionSummary> {
        let session = self.session.as_ref()?;
        let settings = self.settings.as_ref()?;
        Some(SessionSummary {
            user_name: session.user_name.clone(),
            sessions: session.session_count,
            focus_minutes: u64::from(session.session_count) * u64::from(settings.work_minutes),
            exercises_completed: self.exercises_done,
        })
    }

    /// Receive a snapshot after every tick and every accepted command.
    ///
    /// The current snapshot is delivered immediately. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        let (tx, rx) = channel();
        if tx.send(self.snapshot()).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }

    // ── Scheduler entry point ────────────────────────────────────────

    /// Evaluate every countdown at the current time.
    ///
    /// The phase countdown is handled first; if it ends the break, the
    /// break's own countdown and the camera are torn down before they are
    /// looked at.
    pub fn tick(&mut self) -> Vec<EngineEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        if let Tick::Expired = self.countdown.tick(now) {
            match self.state {
                EngineState::Work => self.enter_break(TransitionCause::Expired, &mut events),
                EngineState::Break => self.finish_break(TransitionCause::Expired, &mut events),
                EngineState::Idle | EngineState::Stopped => {
                    tracing::warn!("Countdown expired while {}; ignoring", self.state);
                }
            }
        }

        if let Some(break_session) = self.break_session.as_mut() {
            if let Some(local) = break_session.tick(now) {
                let exercise_id = self
                    .rotator
                    .exercise_at(self.global_exercise_index, local)
                    .id
                    .clone();
                tracing::debug!("Exercise timer moved on to '{}'", exercise_id);
                events.push(EngineEvent::ExerciseAdvanced {
                    local_index: local,
                    exercise_id,
                    cause: AdvanceCause::Timer,
                });
            }

            for media_event in self.media.poll(now) {
                events.push(match media_event {
                    MediaEvent::CaptureEnded => EngineEvent::CameraEnded,
                    MediaEvent::Feedback(message) => EngineEvent::Feedback { message },
                });
            }
        }

        self.publish();
        events
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run. Valid from Idle or Stopped.
    pub fn start(&mut self, settings: SessionSettings) -> Result<Vec<EngineEvent>> {
        self.require("start", &[EngineState::Idle, EngineState::Stopped])?;
        debug_assert!(settings.work_secs() > 0 && settings.break_secs() > 0);

        let now = self.clock.now();
        tracing::info!(
            "Starting run for {} ({} min work / {} min break)",
            settings.user_name,
            settings.work_minutes,
            settings.break_minutes
        );

        self.session = Some(Session {
            id: Uuid::new_v4(),
            user_name: settings.user_name.clone(),
            session_count: 1,
            work_duration_secs: settings.work_secs(),
            break_duration_secs: settings.break_secs(),
            started_at: now,
        });
        self.settings = Some(settings);
        self.global_exercise_index = 0;
        self.exercises_done = 0;

        let mut events = Vec::new();
        self.enter_work(TransitionCause::Start, &mut events);
        self.publish();
        Ok(events)
    }

    /// End the break now, exactly as if its countdown had run out.
    /// Whatever was left of the break is discarded.
    pub fn skip_break(&mut self) -> Result<Vec<EngineEvent>> {
        self.require("skip_break", &[EngineState::Break])?;
        let mut events = Vec::new();
        self.finish_break(TransitionCause::Skipped, &mut events);
        self.publish();
        Ok(events)
    }

    /// Cancel every countdown and release the camera. Valid in Work or Break.
    pub fn stop(&mut self) -> Result<Vec<EngineEvent>> {
        self.require("stop", &[EngineState::Work, EngineState::Break])?;

        self.countdown.cancel();
        self.leave_break(false);
        self.state = EngineState::Stopped;

        let summary = self.summary().unwrap_or_else(|| SessionSummary {
            user_name: String::new(),
            sessions: 0,
            focus_minutes: 0,
            exercises_completed: 0,
        });
        tracing::info!(
            "Stopped after {} session(s), {} focus minute(s)",
            summary.sessions,
            summary.focus_minutes
        );

        self.publish();
        Ok(vec![EngineEvent::Stopped { summary }])
    }

    /// Return to Idle with the session count and exercise rotation reset.
    /// Valid only once stopped.
    pub fn restart(&mut self) -> Result<Vec<EngineEvent>> {
        self.require("restart", &[EngineState::Stopped])?;

        self.state = EngineState::Idle;
        self.session = None;
        self.settings = None;
        self.global_exercise_index = 0;
        self.exercises_done = 0;
        tracing::info!("Engine reset to idle");

        self.publish();
        Ok(vec![EngineEvent::Restarted])
    }

    /// Pause exercise auto-advance; the break countdown keeps running
    pub fn enter_rest(&mut self) -> Result<Vec<EngineEvent>> {
        let break_session = self.break_session_for("enter_rest")?;
        if !break_session.enter_rest() {
            return Err(self.reject(Error::RestMode {
                command: "enter_rest",
                resting: true,
            }));
        }
        tracing::debug!("Rest mode on");
        self.publish();
        Ok(vec![EngineEvent::RestEntered])
    }

    /// Leave rest mode and move on to the next exercise
    pub fn exit_rest(&mut self) -> Result<Vec<EngineEvent>> {
        let now = self.clock.now();
        let break_session = self.break_session_for("exit_rest")?;
        match break_session.exit_rest(now) {
            Some(local) => Ok(self.exercise_advanced(local, AdvanceCause::RestEnded)),
            None => Err(self.reject(Error::RestMode {
                command: "exit_rest",
                resting: false,
            })),
        }
    }

    /// "Done, next exercise"
    pub fn advance_exercise(&mut self) -> Result<Vec<EngineEvent>> {
        let now = self.clock.now();
        let break_session = self.break_session_for("advance_exercise")?;
        match break_session.advance_manually(now) {
            Some(local) => Ok(self.exercise_advanced(local, AdvanceCause::Manual)),
            None => Err(self.reject(Error::RestMode {
                command: "advance_exercise",
                resting: true,
            })),
        }
    }

    /// Acknowledge (or un-acknowledge) a checkpoint of the displayed exercise
    pub fn toggle_checkpoint(&mut self, label: &str) -> Result<Vec<EngineEvent>> {
        let resting = self.break_session_for("toggle_checkpoint")?.rest_mode();
        if resting {
            return Err(self.reject(Error::RestMode {
                command: "toggle_checkpoint",
                resting: true,
            }));
        }

        let exercise = self
            .current_exercise()
            .ok_or(Error::InvalidTransition {
                command: "toggle_checkpoint",
                state: self.state,
            })?;
        if !exercise.has_checkpoint(label) {
            let error = Error::UnknownCheckpoint {
                exercise: exercise.name.clone(),
                label: label.to_string(),
            };
            return Err(self.reject(error));
        }

        let checked = self
            .break_session_for("toggle_checkpoint")?
            .toggle_checkpoint(label);
        self.publish();
        Ok(vec![EngineEvent::CheckpointToggled {
            label: label.to_string(),
            checked,
        }])
    }

    /// Point the camera at a UI surface. Never reacquires the capture.
    pub fn bind_camera(&mut self, consumer: ConsumerId) {
        self.media.bind(consumer);
    }

    /// Forget a UI surface that went away. The capture stays alive.
    pub fn unbind_camera(&mut self, consumer: ConsumerId) {
        self.media.unbind(consumer);
    }

    // ── Transitions ──────────────────────────────────────────────────

    fn enter_work(&mut self, cause: TransitionCause, events: &mut Vec<EngineEvent>) {
        let Some(work_secs) = self.settings.as_ref().map(|s| s.work_secs()) else {
            return;
        };
        let now = self.clock.now();
        self.state = EngineState::Work;
        self.countdown.arm(work_secs, now);

        let session_count = self.session_count();
        tracing::info!("Work phase {} started ({}s)", session_count, work_secs);
        events.push(EngineEvent::PhaseEntered {
            phase: Phase::Work,
            session_count,
            duration_secs: work_secs,
            cause,
        });
    }

    fn enter_break(&mut self, cause: TransitionCause, events: &mut Vec<EngineEvent>) {
        let Some(break_secs) = self.settings.as_ref().map(|s| s.break_secs()) else {
            return;
        };
        let now = self.clock.now();
        self.countdown.cancel();
        self.state = EngineState::Break;
        self.countdown.arm(break_secs, now);
        self.break_session = Some(BreakSession::begin(self.options.exercise_secs, now));

        let session_count = self.session_count();
        tracing::info!("Break after session {} started ({}s)", session_count, break_secs);
        events.push(EngineEvent::PhaseEntered {
            phase: Phase::Break,
            session_count,
            duration_secs: break_secs,
            cause,
        });

        if self.options.camera_enabled {
            match self.media.acquire(now) {
                Ok(()) => events.push(EngineEvent::CameraOnline),
                Err(error) => events.push(EngineEvent::CameraUnavailable { error }),
            }
        }
    }

    /// Break -> Work, by expiry or skip
    fn finish_break(&mut self, cause: TransitionCause, events: &mut Vec<EngineEvent>) {
        self.countdown.cancel();
        self.leave_break(cause == TransitionCause::Expired);

        if let Some(session) = self.session.as_mut() {
            session.session_count += 1;
        }
        self.global_exercise_index = self.rotator.advance_global(self.global_exercise_index);
        self.enter_work(cause, events);
    }

    /// Tear down everything a break scheduled. Runs on every exit path.
    fn leave_break(&mut self, completed: bool) {
        if let Some(mut break_session) = self.break_session.take() {
            break_session.end();
            if completed {
                // Count the exercise that was on screen when the break ran out
                self.exercises_done += break_session.advanced() + 1;
            }
        }
        self.media.release();
    }

    fn exercise_advanced(&mut self, local: u64, cause: AdvanceCause) -> Vec<EngineEvent> {
        let exercise_id = self
            .rotator
            .exercise_at(self.global_exercise_index, local)
            .id
            .clone();
        tracing::debug!("Moved on to '{}' ({:?})", exercise_id, cause);
        self.publish();
        vec![EngineEvent::ExerciseAdvanced {
            local_index: local,
            exercise_id,
            cause,
        }]
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn require(&self, command: &'static str, allowed: &[EngineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.reject(Error::InvalidTransition {
                command,
                state: self.state,
            }))
        }
    }

    fn break_session_for(&mut self, command: &'static str) -> Result<&mut BreakSession> {
        let state = self.state;
        match self.break_session.as_mut() {
            Some(break_session) if state == EngineState::Break => Ok(break_session),
            _ => {
                let error = Error::InvalidTransition { command, state };
                tracing::warn!("Rejected command: {}", error);
                Err(error)
            }
        }
    }

    fn reject(&self, error: Error) -> Error {
        tracing::warn!("Rejected command: {}", error);
        error
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}
