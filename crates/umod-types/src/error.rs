//! Error types for the uMod agent.

use std::io;

/// Errors produced by the agent crates.
#[derive(Debug, thiserror::Error)]
pub enum UmodError {
    #[error("command error: {0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("process error: {0}")]
    Process(String),

    #[error("console error: {0}")]
    Console(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, UmodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_display() {
        let e = UmodError::Command("bad verb".into());
        assert_eq!(format!("{e}"), "command error: bad verb");
    }

    #[test]
    fn registry_error_display() {
        let e = UmodError::Registry("verb 'scan' already registered".into());
        assert_eq!(
            format!("{e}"),
            "registry error: verb 'scan' already registered"
        );
    }

    #[test]
    fn network_error_display() {
        let e = UmodError::Network("connection refused".into());
        assert_eq!(format!("{e}"), "network error: connection refused");
    }

    #[test]
    fn process_error_display() {
        let e = UmodError::Process("spawn failed".into());
        assert_eq!(format!("{e}"), "process error: spawn failed");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: UmodError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: UmodError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let e: UmodError = json_err.into();
        assert!(format!("{e}").contains("JSON error"));
    }

    #[test]
    fn result_alias_err() {
        let r: Result<i32> = Err(UmodError::Config("oops".into()));
        assert!(r.is_err());
    }
}
