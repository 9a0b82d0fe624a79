//! Default catalog of break exercises.
//!
//! The order matters: breaks walk the catalog in sequence, so the default
//! ordering alternates neck/shoulder, hands, back, eyes, feet and breathing.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: prefer `get_default_catalog()`; the configuration clones the
/// cached copy before appending custom exercises.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn exercise(
    id: &str,
    name: &str,
    reps: &str,
    cue: &str,
    checkpoints: [&str; 3],
    steps: [&str; 5],
    accent: &str,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        reps: reps.into(),
        cue: cue.into(),
        checkpoints: checkpoints.iter().map(|c| c.to_string()).collect(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
        accent: Some(accent.into()),
    }
}

fn build_default_catalog_internal() -> Catalog {
    let exercises = vec![
        exercise(
            "neck_rolls",
            "Neck Rolls",
            "5 slow circles each direction",
            "Keep shoulders relaxed, move chin to chest then ear to shoulder",
            ["Shoulders down", "Slow movement", "Full range"],
            [
                "Drop chin to chest",
                "Roll ear to right shoulder",
                "Head back slowly",
                "Roll to left shoulder",
                "Repeat 5x each direction",
            ],
            "#00E5C3",
        ),
        exercise(
            "shoulder_shrugs",
            "Shoulder Shrugs",
            "10 reps",
            "Raise shoulders to ears, hold 2 sec, release fully",
            ["Full raise", "Hold at top", "Full release"],
            [
                "Sit or stand tall",
                "Raise both shoulders to ears",
                "Hold for 2 seconds",
                "Drop shoulders fully",
                "Repeat 10 times",
            ],
            "#FF6B6B",
        ),
        exercise(
            "wrist_circles",
            "Wrist Circles",
            "10 circles each direction",
            "Extend arms, make fists, rotate wrists in full circles",
            ["Arms extended", "Full rotation", "Both directions"],
            [
                "Extend arms forward",
                "Make loose fists",
                "Rotate wrists clockwise x10",
                "Rotate counter-clockwise x10",
                "Shake hands out",
            ],
            "#FFD93D",
        ),
        exercise(
            "seated_spinal_twist",
            "Seated Spinal Twist",
            "3 holds each side (10 sec each)",
            "Sit tall, twist from the waist, use armrest for support",
            ["Spine tall", "Twist from waist", "Breathe steady"],
            [
                "Sit at edge of chair",
                "Place right hand on left knee",
                "Twist torso to the left",
                "Hold 10 seconds, breathe",
                "Switch sides and repeat 3x",
            ],
            "#6BCB77",
        ),
        exercise(
            "eye_focus_shift",
            "Eye Focus Shift",
            "5 near-far cycles",
            "Focus on fingertip held close, then shift to a distant object",
            ["Near focus clear", "Far focus clear", "Blink often"],
            [
                "Hold finger 10cm from face",
                "Focus on fingertip 3 sec",
                "Shift gaze to far wall",
                "Focus on far object 3 sec",
                "Repeat 5x, blink between",
            ],
            "#4D96FF",
        ),
        exercise(
            "ankle_circles",
            "Ankle Circles",
            "10 circles each foot",
            "Lift one foot, rotate ankle slowly in full circles",
            ["Foot lifted", "Full rotation", "Both feet done"],
            [
                "Sit upright in chair",
                "Lift right foot off floor",
                "Rotate ankle clockwise x10",
                "Rotate counter-clockwise x10",
                "Repeat with left foot",
            ],
            "#C77DFF",
        ),
        exercise(
            "deep_breathing",
            "Deep Breathing",
            "5 slow breath cycles",
            "Breathe in 4 sec, hold 4 sec, breathe out 4 sec",
            ["Belly rises", "Hold steady", "Slow exhale"],
            [
                "Sit tall, relax shoulders",
                "Breathe in through nose (4 sec)",
                "Hold your breath (4 sec)",
                "Slowly exhale through mouth (4 sec)",
                "Repeat 5 times",
            ],
            "#F9844A",
        ),
    ];

    Catalog { exercises }
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }

    /// Append user-defined exercises after the built-in ones
    pub fn with_custom(mut self, custom: &[Exercise]) -> Self {
        self.exercises.extend(custom.iter().cloned());
        self
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.exercises.is_empty() {
            errors.push("Catalog has no exercises".to_string());
        }

        let mut seen = HashSet::new();
        for (position, exercise) in self.exercises.iter().enumerate() {
            if exercise.id.is_empty() {
                errors.push(format!("Exercise #{} has empty ID", position));
            } else if !seen.insert(exercise.id.as_str()) {
                errors.push(format!("Duplicate exercise ID '{}'", exercise.id));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", exercise.id));
            }
            if exercise.checkpoints.is_empty() {
                errors.push(format!("Exercise '{}' has no checkpoints", exercise.id));
            }

            let mut labels = HashSet::new();
            for label in &exercise.checkpoints {
                if label.trim().is_empty() {
                    errors.push(format!(
                        "Exercise '{}' has an empty checkpoint label",
                        exercise.id
                    ));
                } else if !labels.insert(label.as_str()) {
                    errors.push(format!(
                        "Exercise '{}' repeats checkpoint '{}'",
                        exercise.id, label
                    ));
                }
            }
        }

        errors
    }
}
