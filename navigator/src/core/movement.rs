//! Axis-aligned movement arithmetic shared by the compiler and the replay.

use crate::core::types::Coord;

/// `start + heading * distance`.
///
/// Returns `None` when the distance or the result does not fit in `i64`.
pub fn advance(start: Coord, heading: Coord, distance: u64) -> Option<Coord> {
    let distance = i64::try_from(distance).ok()?;
    let x = heading
        .x
        .checked_mul(distance)
        .and_then(|dx| start.x.checked_add(dx))?;
    let y = heading
        .y
        .checked_mul(distance)
        .and_then(|dy| start.y.checked_add(dy))?;
    Some(Coord::new(x, y))
}
