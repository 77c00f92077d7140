//! Deterministic replay of stored steps.
//!
//! Every step is recomputed from its own stored `start`, `heading` and
//! `distance`; a step's end is never chained into the next step.

use crate::core::error::ReplayError;
use crate::core::movement::advance;
use crate::core::types::{Coord, Step};

/// One replayed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub index: u32,
    pub start: Coord,
    pub end: Coord,
}

/// Replay `steps` (already ordered by index) into legs.
///
/// An empty slice yields no legs; callers decide what that means.
pub fn replay_steps(steps: &[Step]) -> Result<Vec<Leg>, ReplayError> {
    steps
        .iter()
        .map(|step| {
            let end = advance(step.start, step.heading, step.distance).ok_or(
                ReplayError::Overflow {
                    index: step.index,
                    start: step.start,
                    heading: step.heading,
                    distance: step.distance,
                },
            )?;
            Ok(Leg {
                index: step.index,
                start: step.start,
                end,
            })
        })
        .collect()
}

/// End of the last leg, if any.
pub fn final_position(legs: &[Leg]) -> Option<Coord> {
    legs.last().map(|leg| leg.end)
}
