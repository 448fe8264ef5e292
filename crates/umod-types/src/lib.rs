//! Shared types for the uMod agent crates.

pub mod error;

pub use error::{Result, UmodError};
