//! Mapping from server script extensions to launcher commands.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{Error, Result};
use crate::server::ServerConfig;

/// Extension → launcher command table.
///
/// Extensions are stored without the leading dot and matched exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTable {
    launchers: BTreeMap<String, String>,
}

impl Default for LaunchTable {
    fn default() -> Self {
        Self::empty().with("py", "python").with("js", "node")
    }
}

impl LaunchTable {
    /// A table that accepts nothing.
    pub fn empty() -> Self {
        Self {
            launchers: BTreeMap::new(),
        }
    }

    /// Register (or replace) the launcher for an extension.
    pub fn with(mut self, extension: impl AsRef<str>, command: impl Into<String>) -> Self {
        let extension = extension.as_ref().trim_start_matches('.').to_string();
        self.launchers.insert(extension, command.into());
        self
    }

    /// Recognized extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        self.launchers.keys().cloned().collect()
    }

    /// Launcher command for `path`, if its extension is recognized.
    pub fn command_for(&self, path: &Path) -> Option<&str> {
        let extension = path.extension()?.to_str()?;
        self.launchers.get(extension).map(String::as_str)
    }

    /// Build the server configuration for a script, or reject it before
    /// anything is spawned.
    pub fn resolve(&self, path: &Path) -> Result<ServerConfig> {
        let command = self
            .command_for(path)
            .ok_or_else(|| Error::UnsupportedScript {
                path: path.to_path_buf(),
                allowed: self.extensions(),
            })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(ServerConfig {
            name,
            command: command.to_string(),
            args: vec![path.display().to_string()],
            env: HashMap::new(),
            timeout: None,
        })
    }
}

impl FromIterator<(String, String)> for LaunchTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |table, (ext, cmd)| table.with(ext, cmd))
    }
}
