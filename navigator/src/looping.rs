//! Polling loops for `navigator watch`, `navigator drive` and `navigator run`.
//!
//! Each loop runs one cycle at a time with a constant delay between cycles.
//! A failed cycle is logged and the loop moves on; only startup failures end
//! a loop with an error.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::compile::{CompileOutcome, compile_file};
use crate::io::landmarks::load_catalog;
use crate::io::route_store::RouteStore;
use crate::io::source::{ChangeDetector, SourceState};
use crate::replay::{ReplayOutcome, replay_next};

const STOP_POLL: Duration = Duration::from_millis(100);

/// Stop flag plus an optional cycle cap, checked between cycles.
#[derive(Debug, Clone, Default)]
pub struct LoopControl {
    stop: Arc<AtomicBool>,
    max_cycles: Option<u32>,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn finished(&self, cycles: u32) -> bool {
        self.stop_requested() || self.max_cycles.is_some_and(|max| cycles >= max)
    }

    /// Sleep for `delay`, waking early when a stop is requested.
    fn pause(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        while !self.stop_requested() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            thread::sleep(remaining.min(STOP_POLL));
        }
    }
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u32,
    /// Cycles that ended in an operational error.
    pub failures: u32,
}

/// Compile the instruction file each time it changes.
///
/// On startup the landmark catalog is loaded into the store and any route
/// left unvalidated by an interrupted compile is deleted.
pub fn run_compile_loop<S: RouteStore, F: FnMut(&CompileOutcome)>(
    store: &mut S,
    instructions: &Path,
    landmarks: &Path,
    delay: Duration,
    control: &LoopControl,
    mut on_outcome: F,
) -> Result<LoopSummary> {
    let catalog = load_catalog(landmarks)?;
    store.replace_landmarks(&catalog).context("store landmark catalog")?;
    let recovered = store.discard_unvalidated().context("discard unvalidated routes")?;
    if !recovered.is_empty() {
        warn!(
            routes = ?recovered,
            "discarded routes left unvalidated by an interrupted compile"
        );
    }
    info!(
        instructions = %instructions.display(),
        landmarks = catalog.len(),
        "compile loop started"
    );

    let mut detector = ChangeDetector::new(instructions);
    let mut summary = LoopSummary::default();
    while !control.finished(summary.cycles) {
        summary.cycles += 1;
        let result = detector.poll().and_then(|state| match state {
            SourceState::Changed => compile_file(store, &catalog, instructions).map(Some),
            SourceState::Unchanged => Ok(None),
            SourceState::Missing => {
                warn!(path = %instructions.display(), "instruction source is missing");
                Ok(None)
            }
        });
        match result {
            Ok(Some(outcome)) => on_outcome(&outcome),
            Ok(None) => {}
            Err(err) => {
                summary.failures += 1;
                error!(
                    cycle = summary.cycles,
                    error = %format!("{err:#}"),
                    "compile cycle failed"
                );
            }
        }
        if !control.finished(summary.cycles) {
            control.pause(delay);
        }
    }
    debug!(cycles = summary.cycles, failures = summary.failures, "compile loop stopped");
    Ok(summary)
}

/// Replay pending routes on a fixed interval.
pub fn run_replay_loop<S: RouteStore, F: FnMut(&ReplayOutcome)>(
    store: &mut S,
    delay: Duration,
    control: &LoopControl,
    mut on_outcome: F,
) -> Result<LoopSummary> {
    info!("replay loop started");
    let mut summary = LoopSummary::default();
    while !control.finished(summary.cycles) {
        summary.cycles += 1;
        match replay_next(store) {
            Ok(outcome) => on_outcome(&outcome),
            Err(err) => {
                summary.failures += 1;
                error!(
                    cycle = summary.cycles,
                    error = %format!("{err:#}"),
                    "replay cycle failed"
                );
            }
        }
        if !control.finished(summary.cycles) {
            control.pause(delay);
        }
    }
    debug!(cycles = summary.cycles, failures = summary.failures, "replay loop stopped");
    Ok(summary)
}
