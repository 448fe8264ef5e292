//! Agent settings loaded from `uMod.Agent.toml`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use umod_types::error::{Result, UmodError};

/// File looked up in the start directory.
pub const CONFIG_FILE_NAME: &str = "uMod.Agent.toml";

/// Top-level agent configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub session: SessionConfig,
    pub console: ConsoleConfig,
    pub download: DownloadConfig,
    pub patcher: PatcherConfig,
    pub steam: SteamConfig,
}

impl AgentConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| UmodError::Config(format!("{CONFIG_FILE_NAME}: {e}")))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("loading config from {}", path.display());
                Self::from_toml(&text)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            },
            Err(e) => Err(e.into()),
        }
    }
}

/// `[session]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Chain run when the agent is started without arguments.
    pub default_chain: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_chain: "scan;patch;launch".to_string(),
        }
    }
}

/// `[console]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Columns left free to the right of a new progress bar.
    pub progress_margin: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            progress_margin: 10,
        }
    }
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub buffer_size: usize,
    pub user_agent: String,
    pub max_redirects: u8,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl DownloadConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            user_agent: format!("uMod.Agent/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
            connect_timeout_secs: 10,
            read_timeout_secs: 15,
        }
    }
}

/// `[patcher]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    /// Patcher executable, relative to the working directory.
    pub file_name: String,
    /// Where to fetch the patcher from when it is missing.
    pub url: String,
    /// Patch file location; `{kind}`, `{game}` and `{file}` are substituted.
    pub patch_url_template: String,
    /// Arguments placed before the patch file name.
    pub args: String,
}

impl PatcherConfig {
    pub fn patch_url(&self, kind: &str, game: &str, file: &str) -> String {
        self.patch_url_template
            .replace("{kind}", kind)
            .replace("{game}", game)
            .replace("{file}", file)
    }
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            file_name: "OxidePatcher.exe".to_string(),
            url: "https://github.com/OxideMod/Snapshots/raw/master/OxidePatcher.exe".to_string(),
            patch_url_template:
                "https://github.com/OxideMod/Oxide/raw/develop/Games/{kind}/Oxide.Game.{game}/{file}"
                    .to_string(),
            args: "-c -p".to_string(),
        }
    }
}

/// `[steam]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    /// steamcmd install directory, relative to the working directory.
    pub directory: String,
    pub windows_url: String,
    pub linux_url: String,
}

impl SteamConfig {
    /// Archive URL for the running platform.
    pub fn archive_url(&self) -> &str {
        if cfg!(windows) {
            &self.windows_url
        } else {
            &self.linux_url
        }
    }
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            directory: "Steam".to_string(),
            windows_url: "https://steamcdn-a.akamaihd.net/client/installer/steamcmd.zip".to_string(),
            linux_url: "https://steamcdn-a.akamaihd.net/client/installer/steamcmd_linux.tar.gz"
                .to_string(),
        }
    }
}
