//! I/O helpers: terminal, files, processes and the completion service.

pub mod completion;
pub mod config;
pub mod console;
pub mod credentials;
pub mod files;
pub mod paths;
pub mod process;
pub mod prompt;
pub mod safety_rules;
pub mod sse;
pub mod transcript;
