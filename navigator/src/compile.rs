//! Orchestration for compiling one instruction batch into the store.
//!
//! A batch moves `Idle → Compiling → {Validated, Aborted}`. Entering
//! `Compiling` persists an unvalidated route; the pure compiler then either
//! yields every move (committed with `validated = true` in one transaction)
//! or a [`Rejection`], in which case the route is deleted.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::core::compiler::compile_lines;
use crate::core::error::Rejection;
use crate::core::types::{Coord, LandmarkCatalog, RouteId};
use crate::io::route_store::RouteStore;
use crate::io::source::read_instructions;

/// Result of one compile cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The batch had no non-blank lines; no route was created.
    Empty,
    /// Route committed and visible to the executor.
    Validated {
        route_id: RouteId,
        steps: usize,
        end: Coord,
    },
    /// A line failed; the route and its steps were removed.
    Rejected {
        route_id: RouteId,
        rejection: Rejection,
    },
}

/// Compile `lines` against `catalog` and persist the result in `store`.
///
/// Rejections are returned as [`CompileOutcome::Rejected`]; `Err` is reserved
/// for store failures. A store failure after the route was created still
/// attempts to discard the route first.
pub fn compile_batch<S: RouteStore, L: AsRef<str>>(
    store: &mut S,
    catalog: &LandmarkCatalog,
    lines: &[L],
    now: DateTime<Utc>,
) -> Result<CompileOutcome> {
    if lines.is_empty() {
        debug!("instruction batch is empty");
        return Ok(CompileOutcome::Empty);
    }

    let route = store.begin_route(now).context("create route")?;
    debug!(route_id = route.id, lines = lines.len(), "compiling batch");

    match compile_lines(lines, catalog) {
        Ok(compiled) => {
            if let Err(err) = store.commit_route(route.id, &compiled.moves) {
                discard_after_failure(store, route.id);
                return Err(err.context(format!("commit route {}", route.id)));
            }
            info!(
                route_id = route.id,
                steps = compiled.moves.len(),
                end = %compiled.cursor.position,
                "batch validated"
            );
            Ok(CompileOutcome::Validated {
                route_id: route.id,
                steps: compiled.moves.len(),
                end: compiled.cursor.position,
            })
        }
        Err(rejection) => {
            store
                .discard_route(route.id)
                .with_context(|| format!("roll back route {}", route.id))?;
            warn!(
                route_id = route.id,
                kind = rejection.error.kind(),
                line_no = rejection.line_no + 1,
                line = %rejection.line,
                "batch rejected"
            );
            Ok(CompileOutcome::Rejected {
                route_id: route.id,
                rejection,
            })
        }
    }
}

/// Read the instruction file at `path` and compile it.
pub fn compile_file<S: RouteStore>(
    store: &mut S,
    catalog: &LandmarkCatalog,
    path: &Path,
) -> Result<CompileOutcome> {
    let lines = read_instructions(path)?;
    compile_batch(store, catalog, &lines, Utc::now())
}

fn discard_after_failure<S: RouteStore>(store: &mut S, route_id: RouteId) {
    if let Err(err) = store.discard_route(route_id) {
        error!(
            route_id,
            error = %format!("{err:#}"),
            "failed to discard route after commit error"
        );
    }
}
