// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

pub mod events;
pub mod reminder_dispatch;

// Re-export command types for convenience
pub use commands::gpq::{Context, Data, Error};
