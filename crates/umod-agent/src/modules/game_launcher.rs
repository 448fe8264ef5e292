//! `launch`: start the located game's executable.

use std::rc::Rc;

use umod_terminal::command::split_arguments;
use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};

use super::located_game;
use crate::module::{Handler, Module, dispatch, verbs_of};
use crate::process::ProcessSpawner;

pub struct GameLauncher {
    spawner: Rc<dyn ProcessSpawner>,
}

impl GameLauncher {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] = &[("launch", Self::cmd_launch)];

    pub fn new(spawner: Rc<dyn ProcessSpawner>) -> Self {
        Self { spawner }
    }

    fn cmd_launch(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.execute(out, "scan");
        let Some(game) = located_game(ctx) else {
            log::debug!("launch skipped, no game located");
            ctx.error_flag = true;
            return true;
        };
        let Some(exe) = game.key_files().first() else {
            ctx.error_flag = true;
            return true;
        };

        out.write_static_line(&format!(
            "$whiteLaunching game $green{}$white...",
            escape(&game.name)
        ));

        let program = ctx.resolve(&exe.path);
        let args = split_arguments(&game.launch_arguments);
        match self.spawner.spawn(&program, &args, ctx.working_directory()) {
            Ok(pid) => {
                log::info!("launched {} (pid {pid})", game.name);
                ctx.error_flag = false;
            },
            Err(e) => {
                out.write_static_line(&format!("$redFailed to launch: {}", escape(&e.to_string())));
                ctx.error_flag = true;
            },
        }
        true
    }
}

impl CommandHandler for GameLauncher {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for GameLauncher {
    fn name(&self) -> &'static str {
        "GameLauncher"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
