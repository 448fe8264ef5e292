//! `cd`, `ls`/`dir` and the path-safety check other modules rely on.

use std::path::{Path, PathBuf};

use umod_terminal::context::normalize_path;
use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};
use umod_types::error::Result;

use crate::module::{Handler, Module, dispatch, verbs_of};

/// File-system commands.
///
/// Writes are only allowed below the executable's directory or the
/// directory the process was started in.
pub struct FileSystem {
    start_dir: PathBuf,
    exe_dir: Option<PathBuf>,
}

impl FileSystem {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] =
        &[("cd", Self::cmd_cd), ("dir", Self::cmd_ls), ("ls", Self::cmd_ls)];

    pub fn new(start_dir: impl AsRef<Path>, exe_dir: Option<PathBuf>) -> Self {
        Self {
            start_dir: normalize_path(start_dir.as_ref()),
            exe_dir: exe_dir.map(|d| normalize_path(&d)),
        }
    }

    /// Roots taken from the running process.
    pub fn from_process() -> Result<Self> {
        let start_dir = std::env::current_dir()?;
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Ok(Self::new(start_dir, exe_dir))
    }

    /// Directory the process was started in.
    pub fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    /// Whether `path` is safe to write to.
    ///
    /// Relative paths are never safe.
    pub fn security_check(&self, path: &Path) -> bool {
        if !path.is_absolute() {
            return false;
        }
        let path = normalize_path(path);
        self.exe_dir
            .iter()
            .chain(std::iter::once(&self.start_dir))
            .any(|root| is_within(&path, root))
    }

    fn cmd_cd(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.error_flag = false;
        if cmd.simple_args().is_empty() {
            ctx.set_working_directory(&self.start_dir);
            return true;
        }

        let requested = cmd.simple_args().join(" ");
        let target = ctx.resolve(&requested);
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(requested);

        if target.is_file() {
            out.write_static_line(&format!("$red{} is a file!", escape(&name)));
            ctx.error_flag = true;
        } else if !target.is_dir() {
            out.write_static_line(&format!("$red{} does not exist!", escape(&name)));
            ctx.error_flag = true;
        } else {
            log::debug!("working directory -> {}", target.display());
            ctx.set_working_directory(target);
        }
        true
    }

    fn cmd_ls(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.error_flag = false;
        let entries = match std::fs::read_dir(ctx.working_directory()) {
            Ok(entries) => entries,
            Err(e) => {
                out.write_static_line(&format!("$red{}", escape(&e.to_string())));
                ctx.error_flag = true;
                return true;
            },
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
        dirs.sort();
        files.sort();

        for dir in dirs {
            out.write_static_line(&format!("$graydir $white{}", escape(&dir)));
        }
        for file in files {
            out.write_static_line(&format!("$grayfile $white{}", escape(&file)));
        }
        true
    }
}

/// Component-wise prefix test; case-insensitive on Windows.
fn is_within(path: &Path, root: &Path) -> bool {
    if cfg!(windows) {
        let lower = |p: &Path| PathBuf::from(p.to_string_lossy().to_lowercase());
        lower(path).starts_with(lower(root))
    } else {
        path.starts_with(root)
    }
}

impl CommandHandler for FileSystem {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for FileSystem {
    fn name(&self) -> &'static str {
        "FileSystem"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
