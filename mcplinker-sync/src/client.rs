//! Supported clients and where their config files live.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a client's file marks an entry as disabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisabledLayout {
    /// A sibling `__disabled` object next to the servers object.
    Section,
    /// `"disabled": true` on the entry itself.
    Flag,
    /// `"isActive": false` on the entry itself.
    IsActive,
}

/// Section key holding disabled entries in the [`DisabledLayout::Section`] layout.
pub const DISABLED_SECTION: &str = "__disabled";

/// A known MCP client, or a user-supplied JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClientKind {
    Claude,
    ClaudeCode,
    Cline,
    RooCode,
    Vscode,
    Cursor,
    Mcphub,
    Windsurf,
    Cherrystudio,
    Mcplinker,
    Custom(String),
}

impl ClientKind {
    pub fn from_id(id: &str) -> Self {
        match id {
            "claude" => ClientKind::Claude,
            "claude_code" => ClientKind::ClaudeCode,
            "cline" => ClientKind::Cline,
            "roo_code" => ClientKind::RooCode,
            "vscode" => ClientKind::Vscode,
            "cursor" => ClientKind::Cursor,
            "mcphub" => ClientKind::Mcphub,
            "windsurf" => ClientKind::Windsurf,
            "cherrystudio" => ClientKind::Cherrystudio,
            "mcplinker" => ClientKind::Mcplinker,
            other => ClientKind::Custom(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ClientKind::Claude => "claude",
            ClientKind::ClaudeCode => "claude_code",
            ClientKind::Cline => "cline",
            ClientKind::RooCode => "roo_code",
            ClientKind::Vscode => "vscode",
            ClientKind::Cursor => "cursor",
            ClientKind::Mcphub => "mcphub",
            ClientKind::Windsurf => "windsurf",
            ClientKind::Cherrystudio => "cherrystudio",
            ClientKind::Mcplinker => "mcplinker",
            ClientKind::Custom(id) => id,
        }
    }

    /// Root key of the servers object.
    pub fn servers_key(&self) -> &'static str {
        match self {
            ClientKind::Vscode => "servers",
            _ => "mcpServers",
        }
    }

    pub fn disabled_layout(&self) -> DisabledLayout {
        match self {
            ClientKind::Cline | ClientKind::RooCode => DisabledLayout::Flag,
            ClientKind::Cherrystudio => DisabledLayout::IsActive,
            _ => DisabledLayout::Section,
        }
    }

    /// Clients with no fixed location; a path must be configured.
    pub fn requires_path(&self) -> bool {
        matches!(self, ClientKind::ClaudeCode | ClientKind::Custom(_))
    }

    /// Resolves the config file for this client.
    ///
    /// `base` is the user-configured path (a project directory for
    /// claude_code / vscode / cursor / roo_code, a file or directory for
    /// custom clients). Empty strings count as unset.
    pub fn config_path(&self, base: Option<&Path>, home: &Path) -> SyncResult<PathBuf> {
        let base = base.filter(|p| !p.as_os_str().is_empty());
        let path = match (self, base) {
            (ClientKind::ClaudeCode, Some(dir)) => dir.join(".mcp.json"),
            (ClientKind::Claude, _) => app_data_dir(home).join("Claude/claude_desktop_config.json"),
            (ClientKind::Cline, _) => vscode_global_storage(home)
                .join("saoudrizwan.claude-dev/settings/cline_mcp_settings.json"),
            (ClientKind::RooCode, Some(dir)) => dir.join(".roo/mcp.json"),
            (ClientKind::RooCode, None) => vscode_global_storage(home)
                .join("rooveterinaryinc.roo-cline/settings/mcp_settings.json"),
            (ClientKind::Vscode, base) => base.unwrap_or(home).join(".vscode/mcp.json"),
            (ClientKind::Cursor, base) => base.unwrap_or(home).join(".cursor/mcp.json"),
            (ClientKind::Mcphub, _) => home.join(".config/mcphub/servers.json"),
            (ClientKind::Windsurf, _) => home.join(".codeium/windsurf/mcp_config.json"),
            (ClientKind::Cherrystudio, _) => home.join(".config/cherrystudio/mcp.json"),
            (ClientKind::Mcplinker, _) => home.join(".config/mcplinker/mcp.json"),
            (ClientKind::Custom(_), Some(given)) => {
                if given.is_file() || given.extension().is_some_and(|ext| ext == "json") {
                    given.to_path_buf()
                } else {
                    given.join("mcp.json")
                }
            }
            (ClientKind::ClaudeCode | ClientKind::Custom(_), None) => {
                return Err(SyncError::PathRequired(self.id().to_string()));
            }
        };
        Ok(path)
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn app_data_dir(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library/Application Support")
    } else if cfg!(target_os = "windows") {
        home.join("AppData/Roaming")
    } else {
        home.join(".config")
    }
}

fn vscode_global_storage(home: &Path) -> PathBuf {
    app_data_dir(home).join("Code/User/globalStorage")
}

/// A client plus the user-configured path, as the UI sends it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTarget {
    pub client: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ClientTarget {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            path: None,
        }
    }

    pub fn with_path(client: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            client: client.into(),
            path: Some(path.into()),
        }
    }

    pub fn kind(&self) -> ClientKind {
        ClientKind::from_id(&self.client)
    }

    fn configured_path(&self) -> Option<&Path> {
        self.path.as_deref().filter(|p| !p.as_os_str().is_empty())
    }

    /// Fails with `PathRequired` when the client has no default location
    /// and no path was configured.
    pub fn validate(&self) -> SyncResult<()> {
        if self.kind().requires_path() && self.configured_path().is_none() {
            return Err(SyncError::PathRequired(self.client.clone()));
        }
        Ok(())
    }

    pub fn config_path(&self, home: &Path) -> SyncResult<PathBuf> {
        self.kind().config_path(self.configured_path(), home)
    }
}
