//! Game identification: `scan`/`detect` and key-file hashing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};
use umod_types::error::{Result, UmodError};

use super::{ConfigSystem, located_game};
use crate::manifest::{GameInfo, LocatedGame, MANIFEST_NAME, Manifest};
use crate::module::{self, Handler, Module, dispatch, verbs_of};

pub struct GameScanner;

impl GameScanner {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] = &[
        ("detect", Self::cmd_scan),
        ("hash", Self::cmd_hash),
        ("md5", Self::cmd_hash),
        ("scan", Self::cmd_scan),
    ];

    fn cmd_scan(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.error_flag = false;
        ctx.extensions_mut().remove::<LocatedGame>();

        let Some(manifest) = load_manifest(ctx) else {
            out.write_static_line("$redFailed to load the manifest");
            ctx.error_flag = true;
            return true;
        };

        let Some(game) = manifest.games.into_iter().find(|g| is_present(ctx, g)) else {
            out.write_static_line("$redNo recognised games found in current directory");
            ctx.error_flag = true;
            return true;
        };

        log::info!("identified {} in {}", game.name, ctx.working_directory().display());
        out.write_static_line(&format!(
            "$whiteIdentified game $green{}$white",
            escape(&game.name)
        ));
        ctx.extensions_mut().insert(LocatedGame(game));
        true
    }

    fn cmd_hash(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.execute(out, "scan");
        let Some(mut game) = located_game(ctx) else {
            ctx.error_flag = true;
            return true;
        };

        let save = cmd.simple_arg(0) == Some("save");
        let mut changed = false;

        for file in game.scan_data.iter_mut().flat_map(|s| s.key_files.iter_mut()) {
            let path = ctx.resolve(&file.path);
            if !path.is_file() {
                continue;
            }
            let current = match sha256_file(&path) {
                Ok(hash) => hash,
                Err(e) => {
                    out.write_static_line(&format!("$red{}", escape(&e.to_string())));
                    ctx.error_flag = true;
                    continue;
                },
            };

            let shown = escape(&file.path);
            out.write_static_line(&format!("$grayCurrent hash for $white{shown}:"));
            out.write_static_line(&format!("$gray{current}"));
            out.write_static_line("");
            out.write_static_line(&format!("$grayKnown hash for $white{shown}:"));
            let known = file.hash.as_deref().filter(|h| !h.is_empty()).unwrap_or("Unknown");
            out.write_static_line(&format!("$gray{}", escape(known)));
            out.write_static_line("");

            if save && file.hash.as_deref() != Some(current.as_str()) {
                file.hash = Some(current);
                changed = true;
            }
        }

        if save {
            if let Err(e) = save_hashes(ctx, &game) {
                out.write_static_line(&format!("$redFailed to save the manifest: {}", escape(&e.to_string())));
                ctx.error_flag = true;
                return true;
            }
            if changed {
                out.write_static_line(&format!(
                    "$whiteSaved hashes for $green{}$white",
                    escape(&game.name)
                ));
            } else {
                out.write_static_line("$grayKnown hashes are up to date");
            }
            ctx.extensions_mut().insert(LocatedGame(game));
        }
        true
    }
}

fn load_manifest(ctx: &CommandContext) -> Option<Manifest> {
    let config = module::module::<ConfigSystem>(ctx)?;
    match config.get_config::<Manifest>(ctx, MANIFEST_NAME) {
        Ok(manifest) => manifest,
        Err(e) => {
            log::warn!("manifest: {e}");
            None
        },
    }
}

/// Every key file exists below the working directory.
fn is_present(ctx: &CommandContext, game: &GameInfo) -> bool {
    let files = game.key_files();
    !files.is_empty() && files.iter().all(|f| ctx.resolve(&f.path).is_file())
}

/// Replace the manifest entry for `game` with its updated hashes.
fn save_hashes(ctx: &CommandContext, game: &GameInfo) -> Result<()> {
    let config = module::module::<ConfigSystem>(ctx).ok_or_else(|| {
        UmodError::Registry("config module is not registered".to_string())
    })?;
    let mut manifest = config.get_config::<Manifest>(ctx, MANIFEST_NAME)?.unwrap_or_default();
    match manifest.games.iter_mut().find(|g| g.name == game.name) {
        Some(entry) => *entry = game.clone(),
        None => manifest.games.push(game.clone()),
    }
    config.save_config(ctx, MANIFEST_NAME, &manifest)
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

impl CommandHandler for GameScanner {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for GameScanner {
    fn name(&self) -> &'static str {
        "GameScanner"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
