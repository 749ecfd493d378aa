// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "sheets/mod.rs"]
pub mod sheets;

#[path = "data/json_store.rs"]
pub mod data;
