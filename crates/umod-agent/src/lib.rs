//! uMod agent: the modules behind the terminal's verbs.
//!
//! A [`ModuleRegistry`] holds one instance of each module, binds their
//! verbs on a [`umod_terminal::CommandEngine`] and is installed on the
//! command context so handlers can reach each other by type.

pub mod config;
pub mod manifest;
pub mod module;
pub mod modules;
pub mod net;
pub mod process;

pub use config::{AgentConfig, CONFIG_FILE_NAME};
pub use manifest::{GameInfo, LocatedGame, Manifest};
pub use module::{Module, ModuleRegistry};
pub use process::{ProcessSpawner, SystemSpawner};
