// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "roster/mod.rs"]
pub mod roster;

#[path = "reminders/reminder_service.rs"]
pub mod reminders;

#[path = "macros/macro_service.rs"]
pub mod macros;

#[path = "quotes/quote_service.rs"]
pub mod quotes;

#[path = "setup/setup_service.rs"]
pub mod setup;

#[path = "hexa/hexa_service.rs"]
pub mod hexa;

#[path = "timezones/timezone_service.rs"]
pub mod timezones;
