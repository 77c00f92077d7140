//! Stable exit codes for navigator CLI commands.

/// Command succeeded: batch validated, route replayed, or loop stopped.
pub const OK: i32 = 0;
/// Operational failure: I/O, store, config or catalog errors.
pub const INVALID: i32 = 1;
/// `navigator replay` found no route to replay.
pub const IDLE: i32 = 2;
/// `navigator compile` rejected the batch.
pub const REJECTED: i32 = 4;
