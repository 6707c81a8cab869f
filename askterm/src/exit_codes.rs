//! Stable exit codes for the askterm binary.

/// Normal exit.
pub const OK: i32 = 0;
/// Startup failed: unusable home, invalid config or invalid safety rules.
pub const INVALID: i32 = 1;
/// Quick mode could not obtain working API settings.
pub const NO_CREDENTIALS: i32 = 2;
