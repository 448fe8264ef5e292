//! `patch`: fetch the patcher and the game's patch file, then run it.

use std::rc::Rc;

use umod_terminal::command::split_arguments;
use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};

use super::downloader::fetch_into;
use super::located_game;
use crate::config::PatcherConfig;
use crate::module::{Handler, Module, dispatch, verbs_of};
use crate::process::ProcessSpawner;

pub struct GamePatcher {
    config: PatcherConfig,
    spawner: Rc<dyn ProcessSpawner>,
}

impl GamePatcher {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] = &[("patch", Self::cmd_patch)];

    pub fn new(config: PatcherConfig, spawner: Rc<dyn ProcessSpawner>) -> Self {
        Self { config, spawner }
    }

    fn cmd_patch(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        if located_game(ctx).is_none() {
            ctx.execute(out, "scan");
        }
        let Some(game) = located_game(ctx) else {
            ctx.error_flag = true;
            return true;
        };
        ctx.error_flag = false;

        let compact = game.compact_name();
        let patch_file = format!("{compact}.opj");

        if !ctx.resolve(&self.config.file_name).is_file()
            && !fetch_into(ctx, out, &self.config.url, &self.config.file_name)
        {
            log::warn!("could not fetch patcher from {}", self.config.url);
            return true;
        }

        let patch_url = self.config.patch_url(game.kind(), &compact, &patch_file);
        if !fetch_into(ctx, out, &patch_url, &patch_file) {
            log::warn!("could not fetch patch file from {patch_url}");
            return true;
        }

        out.write_static_line(&format!(
            "$whitePatching game $green{}$white...",
            escape(&game.name)
        ));

        let program = ctx.resolve(&self.config.file_name);
        let mut args = split_arguments(&self.config.args);
        args.push(patch_file);
        match self.spawner.run(&program, &args, ctx.working_directory()) {
            Ok(0) => log::info!("patched {}", game.name),
            Ok(code) => {
                out.write_static_line(&format!("$redPatcher exited with code {code}"));
                ctx.error_flag = true;
            },
            Err(e) => {
                out.write_static_line(&format!("$redFailed to run the patcher: {}", escape(&e.to_string())));
                ctx.error_flag = true;
            },
        }
        true
    }
}

impl CommandHandler for GamePatcher {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for GamePatcher {
    fn name(&self) -> &'static str {
        "GamePatcher"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
