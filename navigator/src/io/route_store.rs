//! Route store: routes, steps and landmarks in SQLite.
//!
//! The [`RouteStore`] trait is the only channel between the compiler and the
//! executor. `validated` is written only by [`RouteStore::commit_route`] and
//! `completed` only by [`RouteStore::mark_completed`]; a route's steps become
//! visible in the same transaction that sets `validated`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, instrument};

use crate::core::types::{Coord, LandmarkCatalog, Move, Route, RouteId, RouteSummary, Step};

/// Lock wait before a write gives up; the compile and replay loops may run
/// in separate processes against the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistence operations used by the compile and replay cycles.
pub trait RouteStore {
    /// Persist a new route with `validated = false`.
    fn begin_route(&mut self, created_at: DateTime<Utc>) -> Result<Route>;

    /// Write all steps for `route_id` (indexed from 0 in slice order) and set
    /// `validated = true`, atomically.
    fn commit_route(&mut self, route_id: RouteId, moves: &[Move]) -> Result<()>;

    /// Delete a route and any of its steps.
    fn discard_route(&mut self, route_id: RouteId) -> Result<()>;

    /// Delete every route still `validated = false`; returns their ids.
    fn discard_unvalidated(&mut self) -> Result<Vec<RouteId>>;

    /// Routes with `validated ∧ ¬completed`, oldest (smallest id) first.
    fn pending_routes(&self) -> Result<Vec<Route>>;

    /// Steps of one route ordered by index.
    fn route_steps(&self, route_id: RouteId) -> Result<Vec<Step>>;

    fn mark_completed(&mut self, route_id: RouteId) -> Result<()>;

    fn route(&self, route_id: RouteId) -> Result<Option<Route>>;

    /// Every route with its step count, ordered by id.
    fn routes(&self) -> Result<Vec<RouteSummary>>;

    fn replace_landmarks(&mut self, catalog: &LandmarkCatalog) -> Result<()>;
}

/// SQLite-backed [`RouteStore`].
pub struct SqliteRouteStore {
    conn: Connection,
}

impl SqliteRouteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open route store {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT).context("set busy timeout")?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .context("enable WAL journal")?;
        let store = Self { conn };
        store.bootstrap()?;
        debug!(path = %path.display(), "route store opened");
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory route store")?;
        let store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    fn bootstrap(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS route (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    validated INTEGER NOT NULL DEFAULT 0,
                    completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS step (
                    route_id INTEGER NOT NULL REFERENCES route(id) ON DELETE CASCADE,
                    step_index INTEGER NOT NULL,
                    start_x INTEGER NOT NULL,
                    start_y INTEGER NOT NULL,
                    heading_x INTEGER NOT NULL,
                    heading_y INTEGER NOT NULL,
                    distance INTEGER NOT NULL CHECK (distance >= 0),
                    PRIMARY KEY (route_id, step_index)
                );

                CREATE TABLE IF NOT EXISTS landmark (
                    name TEXT PRIMARY KEY,
                    x INTEGER NOT NULL,
                    y INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_route_pending ON route(validated, completed, id);
                ",
            )
            .context("create route store schema")
    }

    fn map_route(row: &Row<'_>) -> rusqlite::Result<Route> {
        let raw: String = row.get(3)?;
        let created_at = DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err))
            })?;
        Ok(Route {
            id: row.get(0)?,
            validated: row.get(1)?,
            completed: row.get(2)?,
            created_at,
        })
    }

    fn map_step(row: &Row<'_>) -> rusqlite::Result<Step> {
        let distance: i64 = row.get(6)?;
        let distance = u64::try_from(distance).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Integer, Box::new(err))
        })?;
        Ok(Step {
            route_id: row.get(0)?,
            index: row.get(1)?,
            start: Coord::new(row.get(2)?, row.get(3)?),
            heading: Coord::new(row.get(4)?, row.get(5)?),
            distance,
        })
    }
}

impl RouteStore for SqliteRouteStore {
    fn begin_route(&mut self, created_at: DateTime<Utc>) -> Result<Route> {
        self.conn
            .execute(
                "INSERT INTO route (validated, completed, created_at) VALUES (0, 0, ?1)",
                params![created_at.to_rfc3339()],
            )
            .context("insert route")?;
        let id = self.conn.last_insert_rowid();
        debug!(route_id = id, "route created");
        Ok(Route {
            id,
            validated: false,
            completed: false,
            created_at,
        })
    }

    #[instrument(skip_all, fields(route_id = route_id, steps = moves.len()))]
    fn commit_route(&mut self, route_id: RouteId, moves: &[Move]) -> Result<()> {
        let tx = self.conn.transaction().context("begin commit transaction")?;
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO step
                        (route_id, step_index, start_x, start_y, heading_x, heading_y, distance)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .context("prepare step insert")?;
            for (idx, mv) in moves.iter().enumerate() {
                let step = mv.into_step(
                    route_id,
                    u32::try_from(idx).context("step index exceeds u32")?,
                );
                let distance = i64::try_from(step.distance)
                    .with_context(|| format!("step {idx}: distance exceeds i64"))?;
                insert
                    .execute(params![
                        step.route_id,
                        step.index,
                        step.start.x,
                        step.start.y,
                        step.heading.x,
                        step.heading.y,
                        distance,
                    ])
                    .with_context(|| format!("insert step {idx} of route {route_id}"))?;
            }
        }
        let updated = tx
            .execute(
                "UPDATE route SET validated = 1 WHERE id = ?1 AND validated = 0",
                params![route_id],
            )
            .context("mark route validated")?;
        if updated != 1 {
            bail!("route {route_id} is missing or already validated");
        }
        tx.commit().context("commit route")?;
        debug!("route validated");
        Ok(())
    }

    fn discard_route(&mut self, route_id: RouteId) -> Result<()> {
        let tx = self.conn.transaction().context("begin discard transaction")?;
        tx.execute("DELETE FROM step WHERE route_id = ?1", params![route_id])
            .context("delete route steps")?;
        tx.execute("DELETE FROM route WHERE id = ?1", params![route_id])
            .context("delete route")?;
        tx.commit().context("commit discard")?;
        debug!(route_id, "route discarded");
        Ok(())
    }

    fn discard_unvalidated(&mut self) -> Result<Vec<RouteId>> {
        let tx = self.conn.transaction().context("begin cleanup transaction")?;
        let ids = {
            let mut stmt = tx
                .prepare("SELECT id FROM route WHERE validated = 0 ORDER BY id")
                .context("prepare unvalidated query")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, RouteId>(0))
                .context("query unvalidated routes")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("read unvalidated routes")?
        };
        for id in &ids {
            tx.execute("DELETE FROM step WHERE route_id = ?1", params![id])
                .context("delete stale steps")?;
            tx.execute("DELETE FROM route WHERE id = ?1", params![id])
                .context("delete stale route")?;
        }
        tx.commit().context("commit cleanup")?;
        Ok(ids)
    }

    fn pending_routes(&self) -> Result<Vec<Route>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, validated, completed, created_at
                 FROM route
                 WHERE validated = 1 AND completed = 0
                 ORDER BY id ASC",
            )
            .context("prepare pending query")?;
        let rows = stmt
            .query_map([], Self::map_route)
            .context("query pending routes")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read pending routes")
    }

    fn route_steps(&self, route_id: RouteId) -> Result<Vec<Step>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT route_id, step_index, start_x, start_y, heading_x, heading_y, distance
                 FROM step
                 WHERE route_id = ?1
                 ORDER BY step_index ASC",
            )
            .context("prepare step query")?;
        let rows = stmt
            .query_map(params![route_id], Self::map_step)
            .with_context(|| format!("query steps of route {route_id}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("read steps of route {route_id}"))
    }

    fn mark_completed(&mut self, route_id: RouteId) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE route SET completed = 1 WHERE id = ?1 AND validated = 1",
                params![route_id],
            )
            .context("mark route completed")?;
        if updated != 1 {
            return Err(anyhow!("route {route_id} is missing or not validated"));
        }
        Ok(())
    }

    fn route(&self, route_id: RouteId) -> Result<Option<Route>> {
        self.conn
            .query_row(
                "SELECT id, validated, completed, created_at FROM route WHERE id = ?1",
                params![route_id],
                Self::map_route,
            )
            .optional()
            .with_context(|| format!("read route {route_id}"))
    }

    fn routes(&self) -> Result<Vec<RouteSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT r.id, r.validated, r.completed, r.created_at, COUNT(s.step_index)
                 FROM route r
                 LEFT JOIN step s ON s.route_id = r.id
                 GROUP BY r.id
                 ORDER BY r.id ASC",
            )
            .context("prepare route listing")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RouteSummary {
                    route: Self::map_route(row)?,
                    step_count: row.get(4)?,
                })
            })
            .context("query routes")?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("read routes")
    }

    fn replace_landmarks(&mut self, catalog: &LandmarkCatalog) -> Result<()> {
        let tx = self.conn.transaction().context("begin landmark transaction")?;
        tx.execute("DELETE FROM landmark", []).context("clear landmarks")?;
        {
            let mut insert = tx
                .prepare("INSERT INTO landmark (name, x, y) VALUES (?1, ?2, ?3)")
                .context("prepare landmark insert")?;
            for (name, coord) in catalog.iter() {
                insert
                    .execute(params![name, coord.x, coord.y])
                    .with_context(|| format!("insert landmark {name:?}"))?;
            }
        }
        tx.commit().context("commit landmarks")?;
        debug!(landmarks = catalog.len(), "landmarks replaced");
        Ok(())
    }
}

#[cfg(test)]
impl SqliteRouteStore {
    pub(crate) fn landmarks(&self) -> Result<LandmarkCatalog> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, x, y FROM landmark ORDER BY name")
            .context("prepare landmark query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Coord::new(row.get(1)?, row.get(2)?),
                ))
            })
            .context("query landmarks")?;
        rows.collect::<rusqlite::Result<LandmarkCatalog>>()
            .context("read landmarks")
    }
}
