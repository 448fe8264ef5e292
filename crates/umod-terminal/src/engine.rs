//! Verb table and dispatch.

use std::collections::HashMap;
use std::rc::Rc;

use umod_types::error::{Result, UmodError};

use crate::command::Command;
use crate::context::CommandContext;
use crate::output::OutputDevice;

/// A function-like object bound to one or more verbs.
pub trait CommandHandler {
    /// Handle `cmd`.
    ///
    /// Returns whether the verb was recognised. Failure of a recognised
    /// command is reported through `ctx.error_flag`, not the return value.
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice)
    -> bool;
}

/// Owns the verb -> handler table.
///
/// Holds no per-call state, so handlers may call back into
/// [`CommandEngine::execute`] from inside their own execution.
#[derive(Default)]
pub struct CommandEngine {
    handlers: HashMap<String, Rc<dyn CommandHandler>>,
}

impl CommandEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `verb` to `handler`. Verbs are unique across all handlers,
    /// compared case-insensitively.
    pub fn register_handler(&mut self, verb: &str, handler: Rc<dyn CommandHandler>) -> Result<()> {
        let key = verb.to_lowercase();
        if key.is_empty() {
            return Err(UmodError::Registry("cannot register an empty verb".to_string()));
        }
        if self.handlers.contains_key(&key) {
            return Err(UmodError::Registry(format!(
                "verb '{key}' is already registered"
            )));
        }
        log::debug!("registered verb '{key}'");
        self.handlers.insert(key, handler);
        Ok(())
    }

    /// Parse `line` and execute it.
    pub fn execute_line(
        &self,
        ctx: &mut CommandContext,
        out: &mut dyn OutputDevice,
        line: &str,
    ) -> bool {
        self.execute(ctx, out, &Command::parse(line))
    }

    /// Look up the verb and invoke its handler.
    ///
    /// Returns `false` when no handler is registered for the verb,
    /// otherwise the handler's own result.
    pub fn execute(
        &self,
        ctx: &mut CommandContext,
        out: &mut dyn OutputDevice,
        cmd: &Command,
    ) -> bool {
        match self.handlers.get(&cmd.verb().to_lowercase()) {
            Some(handler) => {
                log::debug!("dispatching '{}'", cmd.verb());
                handler.handle(ctx, cmd, out)
            },
            None => {
                log::debug!("no handler for verb '{}'", cmd.verb());
                false
            },
        }
    }

    /// Whether a handler is bound to `verb`.
    pub fn is_registered(&self, verb: &str) -> bool {
        self.handlers.contains_key(&verb.to_lowercase())
    }

    /// All registered verbs, sorted.
    pub fn verbs(&self) -> Vec<&str> {
        let mut verbs: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        verbs.sort_unstable();
        verbs
    }
}
