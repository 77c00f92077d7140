//! Deterministic, pure logic shared by the navigator.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod compiler;
pub mod error;
pub mod grammar;
pub mod movement;
pub mod replay;
pub mod types;
