//! One executor cycle: replay the oldest pending route and mark it complete.

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::core::replay::{final_position, replay_steps};
use crate::core::types::{Coord, RouteId};
use crate::io::route_store::RouteStore;

/// Result of one replay cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Nothing replayable. `skipped` lists pending routes that were passed
    /// over: empty ones and ones whose steps leave the grid.
    Idle { skipped: Vec<RouteId> },
    Completed {
        route_id: RouteId,
        steps: usize,
        end: Coord,
        skipped: Vec<RouteId>,
    },
}

impl ReplayOutcome {
    pub fn skipped(&self) -> &[RouteId] {
        match self {
            Self::Idle { skipped } | Self::Completed { skipped, .. } => skipped,
        }
    }
}

/// Replay the first validated, uncompleted route that has steps.
///
/// Routes are visited in id order. Empty routes and routes with a step that
/// cannot be recomputed are skipped and left pending.
pub fn replay_next<S: RouteStore>(store: &mut S) -> Result<ReplayOutcome> {
    let pending = store.pending_routes().context("list pending routes")?;
    let mut skipped = Vec::new();

    for route in pending {
        let steps = store
            .route_steps(route.id)
            .with_context(|| format!("load steps of route {}", route.id))?;
        let legs = match replay_steps(&steps) {
            Ok(legs) => legs,
            Err(err) => {
                error!(route_id = route.id, error = %err, "route cannot be replayed; skipping");
                skipped.push(route.id);
                continue;
            }
        };
        let Some(end) = final_position(&legs) else {
            warn!(route_id = route.id, "route has no steps; skipping");
            skipped.push(route.id);
            continue;
        };

        for leg in &legs {
            debug!(
                route_id = route.id,
                step = leg.index,
                start = %leg.start,
                end = %leg.end,
                "replayed step"
            );
        }

        store
            .mark_completed(route.id)
            .with_context(|| format!("complete route {}", route.id))?;
        info!(route_id = route.id, steps = legs.len(), end = %end, "route completed");
        return Ok(ReplayOutcome::Completed {
            route_id: route.id,
            steps: legs.len(),
            end,
            skipped,
        });
    }

    debug!(skipped = skipped.len(), "no route to replay");
    Ok(ReplayOutcome::Idle { skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Heading, Move};
    use crate::io::route_store::SqliteRouteStore;
    use chrono::Utc;

    fn commit(store: &mut SqliteRouteStore, moves: &[Move]) -> RouteId {
        let route = store.begin_route(Utc::now()).expect("begin");
        store.commit_route(route.id, moves).expect("commit");
        route.id
    }

    fn east_five() -> Vec<Move> {
        vec![
            Move::placement(Coord::ORIGIN),
            Move {
                start: Coord::ORIGIN,
                heading: Some(Heading::East),
                distance: 5,
            },
        ]
    }

    #[test]
    fn completes_route_and_does_not_reselect_it() {
        let mut store = SqliteRouteStore::in_memory().expect("store");
        let route_id = commit(&mut store, &east_five());

        let outcome = replay_next(&mut store).expect("replay");
        assert_eq!(
            outcome,
            ReplayOutcome::Completed {
                route_id,
                steps: 2,
                end: Coord::new(5, 0),
                skipped: Vec::new(),
            }
        );
        assert!(store.route(route_id).expect("read").expect("route").completed);

        let again = replay_next(&mut store).expect("replay");
        assert_eq!(again, ReplayOutcome::Idle { skipped: Vec::new() });
    }

    #[test]
    fn empty_store_is_idle() {
        let mut store = SqliteRouteStore::in_memory().expect("store");
        let outcome = replay_next(&mut store).expect("replay");
        assert_eq!(outcome, ReplayOutcome::Idle { skipped: Vec::new() });
    }

    #[test]
    fn unvalidated_routes_are_invisible() {
        let mut store = SqliteRouteStore::in_memory().expect("store");
        store.begin_route(Utc::now()).expect("begin");
        let outcome = replay_next(&mut store).expect("replay");
        assert_eq!(outcome, ReplayOutcome::Idle { skipped: Vec::new() });
    }

    #[test]
    fn empty_route_is_skipped_without_blocking_newer_routes() {
        let mut store = SqliteRouteStore::in_memory().expect("store");
        let empty = commit(&mut store, &[]);
        let full = commit(&mut store, &east_five());

        let outcome = replay_next(&mut store).expect("replay");
        assert_eq!(
            outcome,
            ReplayOutcome::Completed {
                route_id: full,
                steps: 2,
                end: Coord::new(5, 0),
                skipped: vec![empty],
            }
        );
        assert!(!store.route(empty).expect("read").expect("route").completed);

        let again = replay_next(&mut store).expect("replay");
        assert_eq!(again, ReplayOutcome::Idle { skipped: vec![empty] });
    }

    #[test]
    fn oldest_pending_route_goes_first() {
        let mut store = SqliteRouteStore::in_memory().expect("store");
        let first = commit(&mut store, &east_five());
        let second = commit(&mut store, &[Move::placement(Coord::new(2, 2))]);

        let outcome = replay_next(&mut store).expect("replay");
        assert!(matches!(
            outcome,
            ReplayOutcome::Completed { route_id, .. } if route_id == first
        ));
        let outcome = replay_next(&mut store).expect("replay");
        assert!(matches!(
            outcome,
            ReplayOutcome::Completed { route_id, end, .. }
                if route_id == second && end == Coord::new(2, 2)
        ));
    }

    #[test]
    fn overflowing_route_is_skipped_without_blocking_newer_routes() {
        let mut store = SqliteRouteStore::in_memory().expect("store");
        let broken = commit(
            &mut store,
            &[
                Move::placement(Coord::new(i64::MAX, 0)),
                Move {
                    start: Coord::new(i64::MAX, 0),
                    heading: Some(Heading::East),
                    distance: 1,
                },
            ],
        );
        let good = commit(&mut store, &[Move::placement(Coord::new(2, 2))]);

        let outcome = replay_next(&mut store).expect("replay");
        assert_eq!(
            outcome,
            ReplayOutcome::Completed {
                route_id: good,
                steps: 1,
                end: Coord::new(2, 2),
                skipped: vec![broken],
            }
        );
        assert!(store.route(good).expect("read").expect("route").completed);
        assert!(!store.route(broken).expect("read").expect("route").completed);
    }
}
