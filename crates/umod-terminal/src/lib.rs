//! Command engine and console renderer for the uMod agent.
//!
//! A line of text is parsed into a [`Command`], dispatched by the
//! [`CommandEngine`] to a registered [`CommandHandler`], and whatever the
//! handler writes lands in an [`OutputDevice`] that repaints a fixed-height
//! console viewport from a scrollback of live UI components.

pub mod command;
pub mod console;
pub mod context;
pub mod crossterm_console;
pub mod engine;
pub mod markup;
pub mod output;
pub mod ui;

pub use command::Command;
pub use console::{BufferConsole, Console};
pub use context::{CommandContext, Extensions};
pub use crossterm_console::CrosstermConsole;
pub use engine::{CommandEngine, CommandHandler};
pub use output::{ConsoleOutputDevice, OutputDevice};
pub use ui::{ComponentId, LabelHandle, ProgressBarHandle, UiComponent};
