//! Route compiler and replay executor for a grid-walking robot.
//!
//! Text instructions are compiled into validated routes of movement steps,
//! persisted in SQLite, and later replayed by an independent executor. The
//! crate keeps the same split throughout:
//!
//! - **[`core`]**: Pure logic (tokenizer, grammar rules, cursor, replay
//!   arithmetic). No I/O.
//! - **[`io`]**: Side effects (instruction and landmark files, config, the
//!   route store).
//!
//! Orchestration modules ([`compile`], [`replay`], [`looping`]) combine the
//! two to implement the CLI commands.

pub mod compile;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod replay;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
