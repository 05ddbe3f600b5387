//! Dense-order position keys and the allocator that hands them out.
//!
//! Positions are `f64` values. Inserting between two neighbors takes their
//! midpoint, so a move writes exactly one row. Repeated midpoints eventually
//! run out of representable values; the allocator reports that instead of
//! producing a duplicate, and the container has to be renumbered.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::sequence::Neighbors;

/// Ordering key of a list within its board or a card within its list.
///
/// Comparison uses IEEE total ordering so positions can be sorted and used
/// as keys without caveats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(f64);

impl Position {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The `n`th slot (1-based) of an evenly spaced sequence.
    pub fn nth(n: usize, step: f64) -> Self {
        Self(n as f64 * step)
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Position {}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Position {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AllocationError {
    #[error("no representable position between {prev:?} and {next:?}")]
    Exhausted {
        prev: Option<Position>,
        next: Option<Position>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAllocator {
    step: f64,
}

impl PositionAllocator {
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Position for an entity inserted between `neighbors`.
    ///
    /// The result is strictly greater than `prev` and strictly less than
    /// `next`, or an error.
    pub fn allocate(&self, neighbors: &Neighbors) -> Result<Position, AllocationError> {
        let prev = neighbors.prev.map(|a| a.position);
        let next = neighbors.next.map(|a| a.position);
        let exhausted = AllocationError::Exhausted { prev, next };

        let candidate = match (prev, next) {
            (None, None) => self.step,
            (Some(p), None) => p.value() + self.step,
            (None, Some(n)) => n.value() - self.step,
            (Some(p), Some(n)) => {
                let (p, n) = (p.value(), n.value());
                // Written as p + (n - p) / 2 so two large values cannot overflow.
                p + (n - p) / 2.0
            }
        };

        let candidate = Position::new(candidate);
        let above_prev = prev.map_or(true, |p| p < candidate);
        let below_next = next.map_or(true, |n| candidate < n);
        if candidate.is_finite() && above_prev && below_next {
            tracing::debug!(?prev, ?next, position = %candidate, "allocated position");
            Ok(candidate)
        } else {
            tracing::debug!(?prev, ?next, "position space exhausted");
            Err(exhausted)
        }
    }

    /// Position for appending after `last` (or into an empty container).
    pub fn append(&self, last: Option<Position>) -> Result<Position, AllocationError> {
        self.allocate(&Neighbors::after(last))
    }
}

/// Whether a freshly allocated position sits closer than `min_gap` to one of
/// its neighbors.
pub fn is_fragmented(position: Position, neighbors: &Neighbors, min_gap: f64) -> bool {
    let below = neighbors
        .prev
        .map_or(f64::INFINITY, |p| position.value() - p.position.value());
    let above = neighbors
        .next
        .map_or(f64::INFINITY, |n| n.position.value() - position.value());
    below.min(above) < min_gap
}
