//! Test-only fixtures: catalogs, scratch instruction files and a store that
//! fails on commit.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::core::types::{Coord, LandmarkCatalog, Move, Route, RouteId, RouteSummary, Step};
use crate::io::route_store::RouteStore;

/// Build a catalog from `(name, x, y)` triples.
pub fn catalog(entries: &[(&str, i64, i64)]) -> LandmarkCatalog {
    entries
        .iter()
        .map(|&(name, x, y)| (name, Coord::new(x, y)))
        .collect()
}

/// Scratch directory holding an instruction file, a landmark file and a
/// SQLite store path.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn instructions_path(&self) -> PathBuf {
        self.root().join("instructions.txt")
    }

    pub fn landmarks_path(&self) -> PathBuf {
        self.root().join("landmarks.txt")
    }

    pub fn store_path(&self) -> PathBuf {
        self.root().join("navigator.db")
    }

    pub fn write_instructions(&self, lines: &[&str]) -> Result<()> {
        let mut contents = lines.join("\n");
        contents.push('\n');
        let path = self.instructions_path();
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn write_landmarks(&self, contents: &str) -> Result<()> {
        let path = self.landmarks_path();
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }
}

/// Delegates to `inner` but refuses every commit.
pub struct FailingCommitStore<S> {
    inner: S,
}

impl<S: RouteStore> FailingCommitStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: RouteStore> RouteStore for FailingCommitStore<S> {
    fn begin_route(&mut self, created_at: DateTime<Utc>) -> Result<Route> {
        self.inner.begin_route(created_at)
    }

    fn commit_route(&mut self, route_id: RouteId, _moves: &[Move]) -> Result<()> {
        bail!("scripted commit failure for route {route_id}")
    }

    fn discard_route(&mut self, route_id: RouteId) -> Result<()> {
        self.inner.discard_route(route_id)
    }

    fn discard_unvalidated(&mut self) -> Result<Vec<RouteId>> {
        self.inner.discard_unvalidated()
    }

    fn pending_routes(&self) -> Result<Vec<Route>> {
        self.inner.pending_routes()
    }

    fn route_steps(&self, route_id: RouteId) -> Result<Vec<Step>> {
        self.inner.route_steps(route_id)
    }

    fn mark_completed(&mut self, route_id: RouteId) -> Result<()> {
        self.inner.mark_completed(route_id)
    }

    fn route(&self, route_id: RouteId) -> Result<Option<Route>> {
        self.inner.route(route_id)
    }

    fn routes(&self) -> Result<Vec<RouteSummary>> {
        self.inner.routes()
    }

    fn replace_landmarks(&mut self, catalog: &LandmarkCatalog) -> Result<()> {
        self.inner.replace_landmarks(catalog)
    }
}
