//! Known-games manifest (`uMod.Manifest.json`).

use serde::{Deserialize, Serialize};

/// Config name of the manifest, as passed to the config system.
pub const MANIFEST_NAME: &str = "Manifest";

/// All games the agent can recognise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    #[serde(default)]
    pub games: Vec<GameInfo>,
}

/// One recognisable game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameInfo {
    pub name: String,
    #[serde(default)]
    pub scan_data: Option<ScanInfo>,
    #[serde(default)]
    pub launch_arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam: Option<SteamInfo>,
}

impl GameInfo {
    /// Key files, or an empty slice when the game has no scan data.
    pub fn key_files(&self) -> &[ScanFileInfo] {
        self.scan_data
            .as_ref()
            .map_or(&[][..], |s| s.key_files.as_slice())
    }

    /// Name with spaces removed, as used in patch file names.
    pub fn compact_name(&self) -> String {
        self.name.replace(' ', "")
    }

    /// `"Unity"` when any key file points into a Unity data folder.
    pub fn kind(&self) -> &'static str {
        let unity = self
            .key_files()
            .iter()
            .any(|f| f.path.contains("_Data") || f.path.contains("Assembly-CSharp.dll"));
        if unity { "Unity" } else { "Other" }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInfo {
    #[serde(default)]
    pub key_files: Vec<ScanFileInfo>,
}

/// A file that must exist for the game to be identified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanFileInfo {
    /// Relative to the game directory.
    pub path: String,
    /// Hex SHA-256 of the expected file contents.
    #[serde(default)]
    pub hash: Option<String>,
}

/// steamcmd details for a dedicated server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SteamInfo {
    #[serde(default = "default_login")]
    pub login: String,
    pub app_id: u32,
    #[serde(default)]
    pub branch: Option<String>,
}

fn default_login() -> String {
    "anonymous".to_string()
}

/// The game identified by the last successful scan, stored in the command
/// context's extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedGame(pub GameInfo);
