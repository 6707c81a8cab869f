//! Terminal chat assistant that can act on the user's machine.
//!
//! A model reply may embed one action payload between control-character
//! markers. askterm shows the prose, hides the payload, and carries out the
//! action under a denylist-based safety policy.
//!
//! - **[`core`]**: Pure, deterministic logic (decoding, parsing,
//!   classification, history). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (terminal, filesystem, child
//!   processes, HTTP). Behind traits where tests substitute fakes.
//!
//! Orchestration modules ([`executor`], [`conflict`], [`turn`], [`repl`])
//! coordinate core logic with I/O for one turn or the whole session.

pub mod conflict;
pub mod core;
pub mod executor;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod repl;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod turn;
