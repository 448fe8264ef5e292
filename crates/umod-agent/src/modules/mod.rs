//! The agent's modules, one per verb domain.

pub mod agent;
pub mod config_system;
pub mod downloader;
pub mod file_system;
pub mod game_launcher;
pub mod game_patcher;
pub mod game_scanner;
pub mod steam_updater;

pub use agent::Agent;
pub use config_system::ConfigSystem;
pub use downloader::Downloader;
pub use file_system::FileSystem;
pub use game_launcher::GameLauncher;
pub use game_patcher::GamePatcher;
pub use game_scanner::GameScanner;
pub use steam_updater::SteamUpdater;

use umod_terminal::CommandContext;

use crate::manifest::{GameInfo, LocatedGame};

/// The game located by the last successful `scan`, if any.
pub fn located_game(ctx: &CommandContext) -> Option<GameInfo> {
    ctx.extensions()
        .get::<LocatedGame>()
        .map(|located| located.0.clone())
}
