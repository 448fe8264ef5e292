//! uMod agent terminal entry point.
//!
//! With no arguments the default chain (`scan;patch;launch`) runs against
//! the current directory. `run:"a;b"` runs a custom chain, `t`/`terminal`
//! opens the interactive prompt afterwards and `ce`/`cleanexit` skips the
//! closing key press.

mod session;

use std::fs::File;
use std::io;
use std::rc::Rc;

use anyhow::{Context, Result};

use session::{LaunchOptions, Session, join_args};
use umod_agent::config::CONFIG_FILE_NAME;
use umod_agent::{AgentConfig, ModuleRegistry};
use umod_terminal::markup;
use umod_terminal::{Command, CrosstermConsole, OutputDevice};

fn main() -> Result<()> {
    init_logging();

    let start_dir = std::env::current_dir().context("reading the current directory")?;
    let config = AgentConfig::load(&start_dir.join(CONFIG_FILE_NAME))?;
    let registry = Rc::new(ModuleRegistry::standard(&config)?);

    let line = join_args(std::env::args());
    log::info!("command line: {line}");
    let options = LaunchOptions::from_command(&Command::parse(&line), &config.session.default_chain);

    let mut session = Session::new(&config, registry, CrosstermConsole::new(), &start_dir)?;

    if let Some(chain) = options.chain.as_deref() {
        session.run_chain(chain);
    }

    if options.terminal {
        session.run_interactive(io::stdin().lock(), |console, prompt| {
            if let Err(e) = console.show_prompt(&markup::parse(prompt)) {
                log::warn!("prompt: {e}");
            }
        })?;
    }

    if !options.clean_exit {
        session.out.write_static_line("");
        session.out.write_static_line("$whitePress any key to continue...");
        session.out.console_mut().wait_for_key()?;
    }
    session.out.console_mut().park_cursor()?;
    log::info!("session ended");
    Ok(())
}

/// Route `log` records to `<temp>/umod-agent.log`, or stderr when the file
/// cannot be created. The filter comes from `UMOD_LOG`.
fn init_logging() {
    let env = env_logger::Env::default().filter_or("UMOD_LOG", "info");
    let mut builder = env_logger::Builder::from_env(env);

    let path = std::env::temp_dir().join("umod-agent.log");
    match File::create(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        },
        Err(e) => eprintln!("cannot open {}: {e}; logging to stderr", path.display()),
    }
    builder.init();
}
