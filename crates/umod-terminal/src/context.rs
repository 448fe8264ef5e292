//! Per-session mutable command state.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use umod_types::error::{Result, UmodError};

use crate::command::Command;
use crate::engine::CommandEngine;
use crate::output::OutputDevice;

/// Mutable state threaded through every command execution.
///
/// Handlers receive it by `&mut` and may hand the same reference to a
/// nested [`CommandContext::execute`] call; whatever they leave behind is
/// what the caller observes on return.
pub struct CommandContext {
    working_directory: PathBuf,
    /// Set by a handler when the command it just ran failed.
    pub error_flag: bool,
    /// When set, the interactive loop exits.
    pub terminate: bool,
    engine: Option<Rc<CommandEngine>>,
    extensions: Extensions,
}

impl CommandContext {
    /// Create a context rooted at `working_directory`.
    pub fn new(working_directory: impl AsRef<Path>) -> Self {
        Self {
            working_directory: normalize_path(working_directory.as_ref()),
            error_flag: false,
            terminate: false,
            engine: None,
            extensions: Extensions::default(),
        }
    }

    /// Absolute, normalised working directory.
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Replace the working directory. The path is normalised first.
    pub fn set_working_directory(&mut self, path: impl AsRef<Path>) {
        self.working_directory = normalize_path(path.as_ref());
    }

    /// Resolve `path` against the working directory and normalise it.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.working_directory.join(path))
    }

    /// Last segment of the working directory, used for prompts.
    pub fn directory_name(&self) -> String {
        self.working_directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.working_directory.to_string_lossy().into_owned())
    }

    /// Attach the engine back-reference. May only happen once.
    pub fn attach(&mut self, engine: Rc<CommandEngine>) -> Result<()> {
        if self.engine.is_some() {
            return Err(UmodError::Command(
                "context is already attached to an engine".to_string(),
            ));
        }
        self.engine = Some(engine);
        Ok(())
    }

    /// The engine this context is attached to.
    pub fn engine(&self) -> Option<Rc<CommandEngine>> {
        self.engine.as_ref().map(Rc::clone)
    }

    /// Parse and execute `line` on the attached engine, re-entrantly.
    ///
    /// Returns `false` when no engine is attached or the verb is unknown.
    pub fn execute(&mut self, out: &mut dyn OutputDevice, line: &str) -> bool {
        self.execute_command(out, &Command::parse(line))
    }

    /// Execute an already parsed command on the attached engine.
    pub fn execute_command(&mut self, out: &mut dyn OutputDevice, cmd: &Command) -> bool {
        match self.engine() {
            Some(engine) => engine.execute(self, out, cmd),
            None => {
                log::warn!("context has no engine; dropping '{}'", cmd.verb());
                false
            },
        }
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Type-keyed storage for session state owned by collaborators.
///
/// Holds at most one value per type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl Extensions {
    /// Insert a value, returning the previous value of the same type.
    pub fn insert<T: 'static>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok().map(|b| *b))
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok().map(|b| *b))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }
}

/// Lexically normalise a path: drop `.`, fold `..`, strip trailing
/// separators. Does not touch the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
