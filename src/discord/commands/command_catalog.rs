// Discord commands module.
// Each feature gets its own command file.

pub mod gpq;

pub mod setup;

pub mod social;

pub mod hexa;

pub mod timezones;
