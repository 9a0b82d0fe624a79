//! Exercise rotation across breaks.
//!
//! Pure index arithmetic over the ordered catalog. The displayed exercise is
//! `catalog[(global + local) mod N]`, where `global` moves forward by `N` after
//! every finished break and `local` counts exercises within one break.

use crate::{Catalog, Error, Exercise, Result};
use serde::Serialize;

/// Position of the displayed exercise
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExerciseCursor {
    /// Monotonic across breaks; reset only by a restart
    pub global: u64,
    /// Per-break; reset when a break begins
    pub local: u64,
}

impl ExerciseCursor {
    pub fn new(global: u64, local: u64) -> Self {
        Self { global, local }
    }
}

/// Maps cursors to exercises. Holds no time-based state and never blocks.
#[derive(Clone, Debug)]
pub struct ExerciseRotator {
    catalog: Catalog,
}

impl ExerciseRotator {
    /// Wrap a catalog. An empty catalog cannot be rotated through.
    pub fn new(catalog: Catalog) -> Result<Self> {
        if catalog.is_empty() {
            return Err(Error::CatalogValidation(
                "cannot rotate through an empty catalog".into(),
            ));
        }
        Ok(Self { catalog })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Catalog length, the step the global cursor advances by
    pub fn len(&self) -> u64 {
        self.catalog.len() as u64
    }

    /// Catalog position for a cursor pair.
    ///
    /// Both operands are reduced before adding, so the result is defined for
    /// every `u64` pair without overflow.
    pub fn index_of(&self, global: u64, local: u64) -> usize {
        let n = self.len();
        ((global % n + local % n) % n) as usize
    }

    pub fn exercise_at(&self, global: u64, local: u64) -> &Exercise {
        &self.catalog.exercises[self.index_of(global, local)]
    }

    pub fn current(&self, cursor: ExerciseCursor) -> &Exercise {
        self.exercise_at(cursor.global, cursor.local)
    }

    /// Global cursor value after one finished break.
    ///
    /// Must be applied exactly once per break; applying it twice
    /// double-advances.
    pub fn advance_global(&self, global: u64) -> u64 {
        global.saturating_add(self.len())
    }

    /// How many exercises a break of `break_secs` is expected to cover
    pub fn planned_for(&self, break_secs: u64, exercise_secs: u64) -> u64 {
        let exercise_secs = exercise_secs.max(1);
        let needed = break_secs.div_ceil(exercise_secs).max(1);
        needed.min(self.len())
    }
}
