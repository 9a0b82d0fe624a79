//! Core domain types for the Breakflow system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Engine states and phases
//! - Exercises and the ordered catalog
//! - Sessions and the end-of-run summary
//! - The read-only projection handed to the UI layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Phases and Engine States
// ============================================================================

/// Top-level mode of operation while a session is running
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Break => "break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every state of the phase engine, including the pre-start and terminal ones
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    Work,
    Break,
    Stopped,
}

impl EngineState {
    /// The running phase, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            EngineState::Work => Some(Phase::Work),
            EngineState::Break => Some(Phase::Break),
            EngineState::Idle | EngineState::Stopped => None,
        }
    }
}

impl From<Phase> for EngineState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Work => EngineState::Work,
            Phase::Break => EngineState::Break,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EngineState::Idle => "idle",
            EngineState::Work => "working",
            EngineState::Break => "on a break",
            EngineState::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

// ============================================================================
// Exercises
// ============================================================================

/// A guided micro-exercise shown during breaks
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    /// Human-readable volume, e.g. "10 reps"
    pub reps: String,
    /// One-line form cue
    pub cue: String,
    /// Self-check items the user can acknowledge
    pub checkpoints: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Display colour hint (`#RRGGBB`)
    #[serde(default)]
    pub accent: Option<String>,
}

impl Exercise {
    pub fn has_checkpoint(&self, label: &str) -> bool {
        self.checkpoints.iter().any(|c| c == label)
    }
}

/// The ordered, fixed catalog of exercises that breaks rotate through
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
}

// ============================================================================
// Sessions
// ============================================================================

/// A running work/break cycle for one user
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub user_name: String,
    /// 1-based; increments on every completed Break -> Work transition
    pub session_count: u32,
    pub work_duration_secs: u64,
    pub break_duration_secs: u64,
    pub started_at: DateTime<Utc>,
}

/// Totals shown once a run has been stopped
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub user_name: String,
    pub sessions: u32,
    pub focus_minutes: u64,
    /// Exercises shown during completed breaks
    pub exercises_completed: u64,
}

// ============================================================================
// UI Projection
// ============================================================================

/// Read-only projection of the engine, published on every tick and command
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub state: EngineState,
    pub phase: Option<Phase>,
    pub user_name: Option<String>,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub session_count: u32,
    pub global_exercise_index: u64,
    pub local_exercise_index: u64,
    /// Only present during a break
    pub current_exercise: Option<Exercise>,
    pub exercise_remaining_secs: Option<u64>,
    pub planned_exercises: Option<u64>,
    pub checked_checkpoints: Vec<String>,
    pub rest_mode: bool,
    pub camera_online: bool,
    /// Newest first
    pub feedback: Vec<String>,
    pub at: DateTime<Utc>,
}

impl Snapshot {
    /// 0.0 .. 1.0 progress through the current phase
    pub fn phase_progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        let elapsed = self.total_secs.saturating_sub(self.remaining_secs);
        elapsed as f64 / self.total_secs as f64
    }
}
