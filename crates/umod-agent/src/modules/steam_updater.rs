//! `steam`/`steamcmd`: install or update the located game through steamcmd,
//! bootstrapping steamcmd itself on first use.

use std::path::Path;
use std::rc::Rc;

use umod_terminal::command::split_arguments;
use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};
use umod_types::error::{Result, UmodError};

use super::downloader::fetch_into;
use super::located_game;
use crate::config::SteamConfig;
use crate::manifest::SteamInfo;
use crate::module::{Handler, Module, dispatch, verbs_of};
use crate::net::Url;
use crate::process::ProcessSpawner;

/// steamcmd entry point inside the steam directory.
pub const STEAMCMD: &str = if cfg!(windows) { "steamcmd.exe" } else { "steamcmd.sh" };

pub struct SteamUpdater {
    config: SteamConfig,
    spawner: Rc<dyn ProcessSpawner>,
}

impl SteamUpdater {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] =
        &[("steam", Self::cmd_steam), ("steamcmd", Self::cmd_steam)];

    pub fn new(config: SteamConfig, spawner: Rc<dyn ProcessSpawner>) -> Self {
        Self { config, spawner }
    }

    fn cmd_steam(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.execute(out, "scan");
        let Some(game) = located_game(ctx) else {
            ctx.error_flag = true;
            return true;
        };
        let Some(steam) = game.steam.as_ref() else {
            out.write_static_line(&format!(
                "$red{} has no steam details in the manifest",
                escape(&game.name)
            ));
            ctx.error_flag = true;
            return true;
        };

        let steam_dir = ctx.resolve(&self.config.directory);
        let exe = steam_dir.join(STEAMCMD);
        if !exe.is_file() {
            if !self.bootstrap(ctx, out, &steam_dir) {
                ctx.error_flag = true;
                return true;
            }
            if !exe.is_file() {
                out.write_static_line(&format!(
                    "$red{STEAMCMD} is missing after extracting the archive"
                ));
                ctx.error_flag = true;
                return true;
            }
        }

        out.write_static_line(&format!(
            "$whiteUpdating game $green{}$white...",
            escape(&game.name)
        ));
        match self.spawner.spawn(&exe, &update_arguments(steam), &steam_dir) {
            Ok(pid) => {
                log::info!("steamcmd started for app {} (pid {pid})", steam.app_id);
                ctx.error_flag = false;
            },
            Err(e) => {
                out.write_static_line(&format!("$redFailed to start steamcmd: {}", escape(&e.to_string())));
                ctx.error_flag = true;
            },
        }
        true
    }

    /// Download and unpack steamcmd into `steam_dir`.
    fn bootstrap(&self, ctx: &mut CommandContext, out: &mut dyn OutputDevice, steam_dir: &Path) -> bool {
        let url = self.config.archive_url();
        let archive_name = Url::parse(url)
            .and_then(|u| u.file_name().map(str::to_string))
            .unwrap_or_else(|| "steamcmd.archive".to_string());

        if let Err(e) = std::fs::create_dir_all(steam_dir) {
            out.write_static_line(&format!("$red{}", escape(&e.to_string())));
            return false;
        }

        let dest = format!("{}/{archive_name}", self.config.directory);
        if !fetch_into(ctx, out, url, &dest) {
            return false;
        }

        let archive = ctx.resolve(&dest);
        let result = self.extract(&archive, steam_dir);
        if let Err(e) = std::fs::remove_file(&archive) {
            log::warn!("could not remove {}: {e}", archive.display());
        }
        match result {
            Ok(()) => true,
            Err(e) => {
                out.write_static_line(&format!("$red{}", escape(&e.to_string())));
                false
            },
        }
    }

    fn extract(&self, archive: &Path, into: &Path) -> Result<()> {
        let args = vec![
            "-xf".to_string(),
            archive.to_string_lossy().into_owned(),
            "-C".to_string(),
            into.to_string_lossy().into_owned(),
        ];
        match self.spawner.run(Path::new("tar"), &args, into)? {
            0 => Ok(()),
            code => Err(UmodError::Process(format!(
                "tar exited with code {code} extracting {}",
                archive.display()
            ))),
        }
    }
}

fn update_arguments(steam: &SteamInfo) -> Vec<String> {
    let mut args = vec![
        "+login".to_string(),
        steam.login.clone(),
        "+force_install_dir".to_string(),
        "../".to_string(),
        "+app_update".to_string(),
        steam.app_id.to_string(),
    ];
    if let Some(branch) = steam.branch.as_deref() {
        args.extend(split_arguments(branch));
    }
    args.push("validate".to_string());
    args.push("+quit".to_string());
    args
}

impl CommandHandler for SteamUpdater {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for SteamUpdater {
    fn name(&self) -> &'static str {
        "SteamUpdater"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
