//! Camera attachment for the break panel.
//!
//! Acquisition and binding have separate lifetimes. A capture is acquired
//! once when a break begins and kept until the break ends (or the capture
//! ends by itself). UI surfaces that want frames come and go far more often;
//! binding one only retargets the retained capture and never reacquires it.

use crate::countdown::{Countdown, Tick};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Why a capture could not be acquired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum MediaError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device available")]
    DeviceUnavailable,
}

/// Identity of a UI surface that displays frames
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ConsumerId(Uuid);

impl ConsumerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live capture handed out by a [`MediaSource`]
pub trait CaptureStream {
    /// Deliver frames to `consumer` from now on, replacing any previous
    /// target. Must not restart the capture.
    fn attach(&mut self, consumer: ConsumerId);

    /// Stop delivering frames without ending the capture
    fn detach(&mut self);

    /// False once the capture has ended on its own
    fn is_live(&self) -> bool;

    /// End the capture and release the device
    fn stop(&mut self);
}

/// Device access, e.g. a platform camera API
pub trait MediaSource {
    fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, MediaError>;
}

/// What the broker noticed while polling
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaEvent {
    /// The capture ended without being released
    CaptureEnded,
    /// A new synthetic feedback message was produced
    Feedback(String),
}

// ============================================================================
// Feedback Feed
// ============================================================================

const DEFAULT_FEEDBACK: [&str; 5] = [
    "✓ Good posture detected",
    "✓ Movement looks smooth",
    "⚠ Raise arms a bit higher",
    "✓ Nice form! Keep going",
    "✓ Breathing looks steady",
];

/// Periodic synthetic feedback shown while the camera is online.
///
/// Messages rotate through a fixed list; the newest is kept first and the
/// history is bounded.
#[derive(Clone, Debug)]
pub struct FeedbackFeed {
    interval_secs: u64,
    capacity: usize,
    messages: Vec<String>,
    next: usize,
    history: VecDeque<String>,
    countdown: Countdown,
}

impl FeedbackFeed {
    pub fn new(interval_secs: u64, capacity: usize) -> Self {
        Self::with_messages(
            interval_secs,
            capacity,
            DEFAULT_FEEDBACK.iter().map(|m| m.to_string()).collect(),
        )
    }

    pub fn with_messages(interval_secs: u64, capacity: usize, messages: Vec<String>) -> Self {
        Self {
            interval_secs: interval_secs.max(1),
            capacity,
            messages,
            next: 0,
            history: VecDeque::new(),
            countdown: Countdown::new(),
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.countdown.arm(self.interval_secs, now);
    }

    /// Stop producing messages and forget the history
    pub fn stop(&mut self) {
        self.countdown.cancel();
        self.history.clear();
        self.next = 0;
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_armed()
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<String> {
        match self.countdown.tick(now) {
            Tick::Expired => {
                self.countdown.arm(self.interval_secs, now);
                let message = self.messages.get(self.next % self.messages.len().max(1))?.clone();
                self.next += 1;
                self.history.push_front(message.clone());
                self.history.truncate(self.capacity);
                Some(message)
            }
            Tick::Running { .. } | Tick::Idle => None,
        }
    }

    /// Newest first
    pub fn history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }
}

// ============================================================================
// Broker
// ============================================================================

/// Binds one retained capture to at most one consumer
pub struct MediaBroker {
    source: Box<dyn MediaSource>,
    capture: Option<Box<dyn CaptureStream>>,
    consumer: Option<ConsumerId>,
    last_error: Option<MediaError>,
    feed: FeedbackFeed,
}

impl MediaBroker {
    pub fn new(source: Box<dyn MediaSource>, feed: FeedbackFeed) -> Self {
        Self {
            source,
            capture: None,
            consumer: None,
            last_error: None,
            feed,
        }
    }

    /// Acquire the capture if none is held.
    ///
    /// A consumer bound before the capture arrived is attached immediately.
    /// Failures are remembered and reported; the caller carries on with the
    /// camera offline.
    pub fn acquire(&mut self, now: DateTime<Utc>) -> Result<(), MediaError> {
        if self.capture.is_some() {
            return Ok(());
        }

        match self.source.acquire() {
            Ok(mut capture) => {
                if let Some(consumer) = self.consumer {
                    capture.attach(consumer);
                }
                self.capture = Some(capture);
                self.last_error = None;
                self.feed.start(now);
                tracing::debug!("Camera capture acquired");
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e);
                tracing::warn!("Camera unavailable, continuing without it: {}", e);
                Err(e)
            }
        }
    }

    /// Route frames to `consumer`.
    ///
    /// Never reacquires or restarts the capture. Binding the consumer that is
    /// already bound does nothing; binding a different one replaces it, so only
    /// the most recent consumer receives frames.
    pub fn bind(&mut self, consumer: ConsumerId) {
        if self.consumer == Some(consumer) {
            return;
        }
        self.consumer = Some(consumer);
        if let Some(capture) = self.capture.as_mut() {
            capture.attach(consumer);
        }
        tracing::debug!("Camera consumer bound: {}", consumer);
    }

    /// Forget `consumer` if it is the bound one. The capture stays alive.
    pub fn unbind(&mut self, consumer: ConsumerId) {
        if self.consumer != Some(consumer) {
            return;
        }
        self.consumer = None;
        if let Some(capture) = self.capture.as_mut() {
            capture.detach();
        }
        tracing::debug!("Camera consumer unbound: {}", consumer);
    }

    /// Stop the capture. Safe to call on every exit path, repeatedly.
    pub fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
            tracing::debug!("Camera capture released");
        }
        self.consumer = None;
        self.feed.stop();
    }

    /// Check capture liveness and advance the feedback feed
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<MediaEvent> {
        let mut events = Vec::new();

        let ended = self.capture.as_ref().is_some_and(|c| !c.is_live());
        if ended {
            tracing::warn!("Camera capture ended unexpectedly");
            self.release();
            events.push(MediaEvent::CaptureEnded);
            return events;
        }

        if self.capture.is_some() {
            if let Some(message) = self.feed.tick(now) {
                events.push(MediaEvent::Feedback(message));
            }
        }

        events
    }

    pub fn is_online(&self) -> bool {
        self.capture.is_some()
    }

    pub fn consumer(&self) -> Option<ConsumerId> {
        self.consumer
    }

    pub fn last_error(&self) -> Option<MediaError> {
        self.last_error
    }

    pub fn feedback(&self) -> Vec<String> {
        self.feed.history()
    }

    pub fn has_pending_feedback(&self) -> bool {
        self.feed.is_running()
    }
}

impl fmt::Debug for MediaBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBroker")
            .field("online", &self.is_online())
            .field("consumer", &self.consumer)
            .field("last_error", &self.last_error)
            .finish()
    }
}

// ============================================================================
// Simulated Camera
// ============================================================================

/// Observable state of a [`SimulatedCamera`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraStats {
    pub acquisitions: u32,
    pub attaches: u32,
    pub stops: u32,
    pub live: bool,
    /// Consumer currently receiving frames
    pub frame_target: Option<ConsumerId>,
}

/// In-process camera for hosts without a device.
///
/// Clones share the same stats, so one handle can be given to the engine and
/// another kept to observe it or to end the capture.
#[derive(Clone, Debug, Default)]
pub struct SimulatedCamera {
    failure: Option<MediaError>,
    stats: Rc<RefCell<CameraStats>>,
}

impl SimulatedCamera {
    /// A camera that always grants access
    pub fn available() -> Self {
        Self::default()
    }

    /// A camera whose acquisition always fails with `error`
    pub fn failing(error: MediaError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn stats(&self) -> CameraStats {
        self.stats.borrow().clone()
    }

    /// Simulate the device going away under a live capture
    pub fn end_capture(&self) {
        let mut stats = self.stats.borrow_mut();
        stats.live = false;
        stats.frame_target = None;
    }
}

impl MediaSource for SimulatedCamera {
    fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, MediaError> {
        if let Some(error) = self.failure {
            return Err(error);
        }
        {
            let mut stats = self.stats.borrow_mut();
            stats.acquisitions += 1;
            stats.live = true;
        }
        Ok(Box::new(SimulatedStream {
            stats: Rc::clone(&self.stats),
        }))
    }
}

struct SimulatedStream {
    stats: Rc<RefCell<CameraStats>>,
}

impl CaptureStream for SimulatedStream {
    fn attach(&mut self, consumer: ConsumerId) {
        let mut stats = self.stats.borrow_mut();
        stats.attaches += 1;
        stats.frame_target = Some(consumer);
    }

    fn detach(&mut self) {
        self.stats.borrow_mut().frame_target = None;
    }

    fn is_live(&self) -> bool {
        self.stats.borrow().live
    }

    fn stop(&mut self) {
        let mut stats = self.stats.borrow_mut();
        stats.stops += 1;
        stats.live = false;
        stats.frame_target = None;
    }
}
