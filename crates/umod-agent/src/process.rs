//! Starting external programs.

use std::path::Path;
use std::process::Command;

use umod_types::error::{Result, UmodError};

/// Starts external processes on behalf of modules.
pub trait ProcessSpawner {
    /// Start `program` detached and return its pid.
    fn spawn(&self, program: &Path, args: &[String], cwd: &Path) -> Result<u32>;

    /// Run `program` to completion and return its exit code.
    fn run(&self, program: &Path, args: &[String], cwd: &Path) -> Result<i32>;
}

/// [`ProcessSpawner`] backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, program: &Path, args: &[String], cwd: &Path) -> Result<u32> {
        log::info!("spawning {} {:?}", program.display(), args);
        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .spawn()
            .map_err(|e| UmodError::Process(format!("{}: {e}", program.display())))?;
        Ok(child.id())
    }

    fn run(&self, program: &Path, args: &[String], cwd: &Path) -> Result<i32> {
        log::info!("running {} {:?}", program.display(), args);
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .status()
            .map_err(|e| UmodError::Process(format!("{}: {e}", program.display())))?;
        status.code().ok_or_else(|| {
            UmodError::Process(format!("{} terminated by signal", program.display()))
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemSpawner
            .spawn(&dir.path().join("does-not-exist"), &[], dir.path())
            .unwrap_err();
        assert!(matches!(err, UmodError::Process(_)));
    }

    #[cfg(unix)]
    #[test]
    fn run_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let code = SystemSpawner
            .run(
                Path::new("sh"),
                &["-c".to_string(), "exit 3".to_string()],
                dir.path(),
            )
            .unwrap();
        assert_eq!(code, 3);
    }
}
