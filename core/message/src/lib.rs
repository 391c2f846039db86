//! Message history for agent runs.
//!
//! Each run owns one [`MessageHistory`]: an ordered, append-only log of the
//! conversation so far. The only non-append mutation is wholesale replacement,
//! which backs the `set_messages` built-in tool.

pub mod history;

pub use history::MessageHistory;
