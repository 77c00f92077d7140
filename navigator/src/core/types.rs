//! Shared deterministic types for the navigator core.
//!
//! These types are the contract between the compiler, the replay, and the
//! route store. They carry no I/O and compare by value.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned route identifier. Ids are never reused, so ordering by id
/// is ordering by age.
pub type RouteId = i64;

/// Integer grid coordinate. Heading unit vectors use the same shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// True if either component is below zero (off the walkable grid).
    pub fn is_negative(self) -> bool {
        self.x < 0 || self.y < 0
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Which way a `turn` instruction rotates the heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

/// Cardinal travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    /// Clockwise order: `turn right` advances one slot, `turn left` goes back one.
    pub const CYCLE: [Heading; 4] = [Heading::East, Heading::South, Heading::West, Heading::North];

    pub fn vector(self) -> Coord {
        match self {
            Heading::East => Coord::new(1, 0),
            Heading::South => Coord::new(0, -1),
            Heading::West => Coord::new(-1, 0),
            Heading::North => Coord::new(0, 1),
        }
    }

    /// Parse a direction word (`east`, `West`, `NORTH`, ...).
    pub fn from_word(word: &str) -> Option<Heading> {
        Self::CYCLE
            .into_iter()
            .find(|heading| heading.name().eq_ignore_ascii_case(word))
    }

    pub fn turned(self, turn: Turn) -> Heading {
        let slot = self.slot();
        let next = match turn {
            Turn::Left => (slot + Self::CYCLE.len() - 1) % Self::CYCLE.len(),
            Turn::Right => (slot + 1) % Self::CYCLE.len(),
        };
        Self::CYCLE[next]
    }

    pub fn name(self) -> &'static str {
        match self {
            Heading::East => "East",
            Heading::South => "South",
            Heading::West => "West",
            Heading::North => "North",
        }
    }

    fn slot(self) -> usize {
        match self {
            Heading::East => 0,
            Heading::South => 1,
            Heading::West => 2,
            Heading::North => 3,
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One compiled move, not yet bound to a stored route.
///
/// `heading: None` marks the initial placement; it is stored as the `(0, 0)`
/// vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub start: Coord,
    pub heading: Option<Heading>,
    pub distance: u64,
}

impl Move {
    pub fn placement(start: Coord) -> Self {
        Self {
            start,
            heading: None,
            distance: 0,
        }
    }

    pub fn heading_vector(&self) -> Coord {
        self.heading.map_or(Coord::ORIGIN, Heading::vector)
    }

    /// Bind this move to a route at position `index`.
    pub fn into_step(self, route_id: RouteId, index: u32) -> Step {
        Step {
            route_id,
            index,
            start: self.start,
            heading: self.heading_vector(),
            distance: self.distance,
        }
    }
}

/// A persisted step, exactly as stored.
///
/// `heading` is the raw stored vector; replay trusts it as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub route_id: RouteId,
    pub index: u32,
    pub start: Coord,
    pub heading: Coord,
    pub distance: u64,
}

/// A persisted route header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub validated: bool,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Route header plus the number of stored steps, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    #[serde(flatten)]
    pub route: Route,
    pub step_count: u32,
}

/// Immutable name → coordinate lookup for `go until you reach landmark`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandmarkCatalog {
    entries: BTreeMap<String, Coord>,
}

impl LandmarkCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a landmark, returning the coordinate it replaced, if any.
    pub fn insert(&mut self, name: impl Into<String>, coord: Coord) -> Option<Coord> {
        self.entries.insert(name.into(), coord)
    }

    pub fn get(&self, name: &str) -> Option<Coord> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Coord)> {
        self.entries
            .iter()
            .map(|(name, coord)| (name.as_str(), *coord))
    }
}

impl<N: Into<String>> FromIterator<(N, Coord)> for LandmarkCatalog {
    fn from_iter<I: IntoIterator<Item = (N, Coord)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (name, coord) in iter {
            catalog.insert(name, coord);
        }
        catalog
    }
}
