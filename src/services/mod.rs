/// Core game operations driven by the player.
pub mod game_service;
/// Remote subscription pump and degraded-mode supervision.
pub mod sync_service;
