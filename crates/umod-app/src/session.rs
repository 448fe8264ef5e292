//! The terminal session: startup options, command chains and the
//! interactive prompt.

use std::io::BufRead;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use umod_agent::{AgentConfig, ModuleRegistry};
use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandEngine, Console, ConsoleOutputDevice, OutputDevice};

/// What the process command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// `run:"a;b;c"` chain, if any.
    pub chain: Option<String>,
    /// `t` / `terminal`: enter the prompt after the chain.
    pub terminal: bool,
    /// `ce` / `cleanexit`: skip the exit pause.
    pub clean_exit: bool,
}

impl LaunchOptions {
    /// Read options from a parsed command line. A line with no arguments
    /// at all runs `default_chain`.
    pub fn from_command(cmd: &Command, default_chain: &str) -> Self {
        if cmd.has_no_args() {
            return Self {
                chain: Some(default_chain.to_string()),
                terminal: false,
                clean_exit: false,
            };
        }
        Self {
            chain: cmd.non_empty_named_arg("run").map(str::to_string),
            terminal: cmd.has_flag(&["t", "terminal"]),
            clean_exit: cmd.has_flag(&["ce", "cleanexit"]),
        }
    }
}

/// Re-join process arguments into one command line.
///
/// Arguments containing whitespace are quoted. For `key:value` arguments
/// only the value is quoted so the pair still parses as a named argument.
pub fn join_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if !arg.contains(char::is_whitespace) {
        return arg.replace('"', "\\\"");
    }
    let quoted = |s: &str| format!("\"{}\"", s.replace('"', "\\\""));
    match arg.split_once(':') {
        Some((key, value))
            if !key.is_empty() && !key.contains(|c: char| c.is_whitespace() || c == '"') =>
        {
            format!("{key}:{}", quoted(value))
        },
        _ => quoted(arg),
    }
}

/// One agent session bound to a console.
pub struct Session<C: Console> {
    pub ctx: CommandContext,
    pub out: ConsoleOutputDevice<C>,
}

impl<C: Console> Session<C> {
    /// Build the engine from `registry` and attach a fresh context rooted
    /// at `start_dir`.
    pub fn new(
        config: &AgentConfig,
        registry: Rc<ModuleRegistry>,
        console: C,
        start_dir: &Path,
    ) -> Result<Self> {
        let mut engine = CommandEngine::new();
        registry
            .register_commands(&mut engine)
            .context("registering module commands")?;

        let mut out = ConsoleOutputDevice::with_progress_margin(console, config.console.progress_margin);
        for module in registry.modules() {
            module.print_info(&mut out, true);
        }

        let mut ctx = CommandContext::new(start_dir);
        ctx.attach(Rc::new(engine))?;
        ModuleRegistry::install(&registry, &mut ctx);
        log::info!(
            "session started in {} with {} modules",
            start_dir.display(),
            registry.len()
        );

        Ok(Self { ctx, out })
    }

    /// `$<dir>/: ` in prompt colours.
    pub fn prompt(&self) -> String {
        format!("$cyan$${}/$white: ", escape(&self.ctx.directory_name()))
    }

    /// Echo `line` after the prompt and execute it. Returns whether a
    /// module handled the verb.
    pub fn run_line(&mut self, line: &str) -> bool {
        let echo = format!("{}{}", self.prompt(), escape(line));
        self.out.write_static_line(&echo);

        let handled = self.ctx.execute(&mut self.out, line);
        if !handled {
            log::debug!("unknown command '{line}'");
            self.out.write_static_line("$redUnknown command!");
        }
        handled
    }

    /// Run every `;`-separated command in order. A failing command does
    /// not stop the chain.
    pub fn run_chain(&mut self, chain: &str) {
        for line in chain.split(';') {
            self.run_line(line);
        }
    }

    /// Read and run lines from `input` until EOF or a terminating command.
    ///
    /// `show_prompt` is called before each read with the console and the
    /// prompt markup. Invalid UTF-8 is decoded lossily.
    pub fn run_interactive<R: BufRead>(
        &mut self,
        mut input: R,
        mut show_prompt: impl FnMut(&mut C, &str),
    ) -> Result<()> {
        let mut buf = Vec::new();
        while !self.ctx.terminate {
            let prompt = self.prompt();
            show_prompt(self.out.console_mut(), &prompt);

            buf.clear();
            if input.read_until(b'\n', &mut buf).context("reading input")? == 0 {
                log::debug!("input closed");
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            self.run_line(line.trim_end_matches(['\r', '\n']));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;
    use umod_agent::modules::FileSystem;
    use umod_agent::{ProcessSpawner, SystemSpawner};
    use umod_terminal::BufferConsole;

    use super::*;

    const MANIFEST: &str = r#"{
        "Games": [
            {
                "Name": "Rust Dedicated",
                "ScanData": { "KeyFiles": [ { "Path": "RustDedicated.exe" } ] },
                "LaunchArguments": "-batchmode"
            }
        ]
    }"#;

    fn session(dir: &TempDir) -> Session<BufferConsole> {
        let config = AgentConfig::default();
        let spawner: Rc<dyn ProcessSpawner> = Rc::new(SystemSpawner);
        let registry = ModuleRegistry::with_parts(
            &config,
            FileSystem::new(dir.path(), None),
            spawner,
        )
        .unwrap();
        Session::new(&config, Rc::new(registry), BufferConsole::new(100, 40), dir.path()).unwrap()
    }

    #[test]
    fn options_default_chain_when_no_args() {
        let opts = LaunchOptions::from_command(&Command::parse("umod"), "scan;patch;launch");
        assert_eq!(opts.chain.as_deref(), Some("scan;patch;launch"));
        assert!(!opts.terminal);
        assert!(!opts.clean_exit);
    }

    #[test]
    fn options_from_flags_and_run() {
        let opts = LaunchOptions::from_command(
            &Command::parse(r#"umod t ce run:"scan;launch""#),
            "scan;patch;launch",
        );
        assert_eq!(opts.chain.as_deref(), Some("scan;launch"));
        assert!(opts.terminal);
        assert!(opts.clean_exit);

        let opts = LaunchOptions::from_command(&Command::parse("umod terminal"), "x");
        assert_eq!(opts.chain, None);
        assert!(opts.terminal);
    }

    #[test]
    fn flags_are_case_sensitive() {
        let opts = LaunchOptions::from_command(&Command::parse("umod T CE"), "x");
        assert!(!opts.terminal);
        assert!(!opts.clean_exit);
    }

    #[test]
    fn joined_args_reparse_to_the_same_values() {
        let line = join_args(["/opt/umod/umod", "t", "run:scan; launch", "My Game"]);
        assert_eq!(line, r#"/opt/umod/umod t run:"scan; launch" "My Game""#);
        let cmd = Command::parse(&line);
        assert_eq!(cmd.named_arg("run"), Some("scan; launch"));
        assert_eq!(cmd.simple_args(), &["t".to_string(), "My Game".to_string()]);
    }

    #[test]
    fn joined_args_escape_quotes() {
        let cmd = Command::parse(&join_args(["umod", r#"say "hi""#]));
        assert_eq!(cmd.simple_arg(0), Some(r#"say "hi""#));
    }

    #[test]
    fn chain_echoes_each_command_with_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&dir);
        s.run_chain("echo one;echo two");
        let name = s.ctx.directory_name();
        let rows = s.out.console().rows();
        assert_eq!(rows[0], format!("${name}/: echo one"));
        assert_eq!(rows[1], "one");
        assert_eq!(rows[2], format!("${name}/: echo two"));
        assert_eq!(rows[3], "two");
    }

    #[test]
    fn unknown_command_is_reported_and_chain_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&dir);
        s.run_chain("frobnicate;echo after");
        assert!(s.out.console().contains("Unknown command!"));
        assert!(s.out.console().contains("after"));
    }

    #[test]
    fn scan_then_launch_without_game_is_a_safe_no_op() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uMod.Manifest.json"), MANIFEST).unwrap();
        let mut s = session(&dir);

        let cmd = Command::parse(r#". run:"scan;launch""#);
        let opts = LaunchOptions::from_command(&cmd, "scan;patch;launch");
        s.run_chain(opts.chain.as_deref().unwrap());

        let console = s.out.console();
        assert!(console.contains(": scan"));
        assert!(console.contains(": launch"));
        assert!(console.contains("No recognised games found in current directory"));
        assert!(!console.contains("Launching game"));
        assert!(!console.contains("Unknown command!"));
        assert!(s.ctx.error_flag);
    }

    #[test]
    fn interactive_loop_runs_until_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&dir);
        let mut prompts = 0;
        s.run_interactive(Cursor::new("echo hi\r\nexit\necho never\n"), |_, prompt| {
            assert!(prompt.starts_with("$cyan$$"));
            prompts += 1;
        })
        .unwrap();
        assert_eq!(prompts, 2);
        assert!(s.ctx.terminate);
        assert!(s.out.console().contains("hi"));
        assert!(!s.out.console().contains("never"));
    }

    #[test]
    fn interactive_loop_stops_at_eof() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&dir);
        s.run_interactive(Cursor::new("echo last"), |_, _| {}).unwrap();
        assert!(!s.ctx.terminate);
        assert!(s.out.console().contains("last"));
    }

    #[test]
    fn empty_chain_segment_is_echoed_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&dir);
        s.run_chain("echo a;;echo b");
        let name = s.ctx.directory_name();
        let rows = s.out.console().rows();
        assert_eq!(rows[2], format!("${name}/:"));
        assert_eq!(rows[3], "Unknown command!");
        assert_eq!(rows[5], "b");
    }

    #[test]
    fn invalid_utf8_line_does_not_end_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&dir);
        s.run_interactive(Cursor::new(&b"\xff\xfe\necho after\n"[..]), |_, _| {}).unwrap();
        assert!(s.out.console().contains("Unknown command!"));
        assert!(s.out.console().contains("after"));
    }

    #[test]
    fn cd_changes_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("server")).unwrap();
        let mut s = session(&dir);
        assert!(s.run_line("cd server"));
        assert_eq!(s.prompt(), "$cyan$$server/$white: ");
    }
}
