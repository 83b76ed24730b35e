// Gameplay tuning, kept apart from runtime/server configuration.

pub mod bot;
pub mod collision;
pub mod vehicle;
