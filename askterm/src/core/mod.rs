//! Deterministic, pure logic for the action pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod decoder;
pub mod history;
pub mod input;
pub mod parser;
pub mod path;
pub mod safety;
pub mod types;
