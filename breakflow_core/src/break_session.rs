//! State that only exists while a break is running.
//!
//! A break owns a second countdown, independent of the break countdown,
//! that advances the local exercise index every exercise duration. Rest mode
//! clears that countdown; leaving rest mode moves on to the next exercise and
//! arms it fresh. Any change of the local index drops the acknowledged
//! checkpoints.

use crate::countdown::{Countdown, Tick};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why the local exercise index moved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceCause {
    /// The per-exercise countdown ran out
    Timer,
    /// The user marked the exercise done
    Manual,
    /// The user came back from rest mode
    RestEnded,
}

#[derive(Clone, Debug)]
pub struct BreakSession {
    local: u64,
    checked: Vec<String>,
    rest_mode: bool,
    exercise_countdown: Countdown,
    exercise_secs: u64,
    advanced: u64,
}

impl BreakSession {
    /// Start a break on the first local exercise with its countdown armed
    pub fn begin(exercise_secs: u64, now: DateTime<Utc>) -> Self {
        debug_assert!(exercise_secs > 0, "exercise duration must be positive");
        let mut exercise_countdown = Countdown::new();
        exercise_countdown.arm(exercise_secs, now);
        Self {
            local: 0,
            checked: Vec::new(),
            rest_mode: false,
            exercise_countdown,
            exercise_secs,
            advanced: 0,
        }
    }

    /// Evaluate the per-exercise countdown.
    ///
    /// Returns the new local index when the countdown expired and the break
    /// moved on to the next exercise.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if self.rest_mode {
            return None;
        }
        match self.exercise_countdown.tick(now) {
            Tick::Expired => Some(self.advance(now)),
            Tick::Running { .. } | Tick::Idle => None,
        }
    }

    /// "Done, next exercise". Not available while resting.
    pub fn advance_manually(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if self.rest_mode {
            return None;
        }
        Some(self.advance(now))
    }

    /// Enter rest mode, clearing the per-exercise countdown.
    /// Returns false if already resting.
    pub fn enter_rest(&mut self) -> bool {
        if self.rest_mode {
            return false;
        }
        self.rest_mode = true;
        self.exercise_countdown.cancel();
        true
    }

    /// Leave rest mode and move to the next exercise with a fresh countdown.
    /// Returns `None` if not resting.
    pub fn exit_rest(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if !self.rest_mode {
            return None;
        }
        self.rest_mode = false;
        Some(self.advance(now))
    }

    /// Flip a checkpoint. Returns whether it is now acknowledged.
    ///
    /// The caller checks that `label` belongs to the displayed exercise.
    pub fn toggle_checkpoint(&mut self, label: &str) -> bool {
        if let Some(position) = self.checked.iter().position(|c| c == label) {
            self.checked.remove(position);
            false
        } else {
            self.checked.push(label.to_string());
            true
        }
    }

    /// Cancel everything this break scheduled
    pub fn end(&mut self) {
        self.exercise_countdown.cancel();
    }

    pub fn local(&self) -> u64 {
        self.local
    }

    /// Acknowledged checkpoints in the order they were ticked
    pub fn checked(&self) -> &[String] {
        &self.checked
    }

    pub fn rest_mode(&self) -> bool {
        self.rest_mode
    }

    /// Seconds left on the displayed exercise; `None` while resting
    pub fn exercise_remaining_secs(&self) -> Option<u64> {
        if self.rest_mode {
            None
        } else {
            Some(self.exercise_countdown.remaining_secs())
        }
    }

    pub fn has_pending_countdown(&self) -> bool {
        self.exercise_countdown.is_armed()
    }

    /// Exercises moved past during this break
    pub fn advanced(&self) -> u64 {
        self.advanced
    }

    fn advance(&mut self, now: DateTime<Utc>) -> u64 {
        self.local += 1;
        self.advanced += 1;
        self.checked.clear();
        self.exercise_countdown.arm(self.exercise_secs, now);
        self.local
    }
}
