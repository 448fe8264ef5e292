//! JSON config files (`uMod.<name>.json`) in the working directory.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};
use umod_types::error::{Result, UmodError};

use super::FileSystem;
use crate::module::{self, Module};

/// Config system module. Binds no verbs.
pub struct ConfigSystem;

impl ConfigSystem {
    /// Where config `name` lives for the current working directory.
    pub fn config_path(ctx: &CommandContext, name: &str) -> PathBuf {
        ctx.resolve(format!("uMod.{name}.json"))
    }

    /// Read config `name`.
    ///
    /// `Ok(None)` when the file is missing or its path fails the
    /// file-system security check.
    pub fn get_config<T: DeserializeOwned>(
        &self,
        ctx: &CommandContext,
        name: &str,
    ) -> Result<Option<T>> {
        let path = Self::config_path(ctx, name);
        if !passes_security_check(ctx, &path) {
            log::warn!("config path {} blocked", path.display());
            return Ok(None);
        }
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Write config `name`, pretty-printed.
    pub fn save_config<T: Serialize>(&self, ctx: &CommandContext, name: &str, value: &T) -> Result<()> {
        let path = Self::config_path(ctx, name);
        if !passes_security_check(ctx, &path) {
            return Err(UmodError::Config(format!(
                "{} blocked due to security reasons",
                path.display()
            )));
        }
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        log::info!("saved {}", path.display());
        Ok(())
    }
}

fn passes_security_check(ctx: &CommandContext, path: &std::path::Path) -> bool {
    module::module::<FileSystem>(ctx).is_some_and(|fs| fs.security_check(path))
}

impl CommandHandler for ConfigSystem {
    fn handle(&self, _ctx: &mut CommandContext, _cmd: &Command, _out: &mut dyn OutputDevice) -> bool {
        false
    }
}

impl Module for ConfigSystem {
    fn name(&self) -> &'static str {
        "Config"
    }

    fn verbs(&self) -> Vec<&'static str> {
        Vec::new()
    }
}
