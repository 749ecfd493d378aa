mod roster_service;
pub mod stats;
pub mod week;

pub use roster_service::{
    DepartureReason, GraphData, Player, ProfileView, RosterError, RosterService, RosterStore,
    ScoreOutcome,
};
