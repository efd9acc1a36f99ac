//! Local system operations: directory listing and whitelisted app launch

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::{Error, Result};

/// Sorted entry names of `directory`
///
/// # Errors
///
/// Returns error if the directory cannot be read
pub async fn list_files(directory: &Path) -> Result<Vec<String>> {
    tracing::info!(directory = %directory.display(), "listing files");

    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Applications that may be launched by spoken name
#[derive(Debug, Clone, Default)]
pub struct AppWhitelist {
    apps: BTreeMap<String, PathBuf>,
}

impl AppWhitelist {
    /// Build a whitelist; names are matched case-insensitively
    #[must_use]
    pub fn new(apps: BTreeMap<String, PathBuf>) -> Self {
        Self {
            apps: apps
                .into_iter()
                .map(|(name, path)| (name.to_ascii_lowercase(), path))
                .collect(),
        }
    }

    /// Executable path for `name`, if whitelisted
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.apps.get(&name.to_ascii_lowercase()).map(PathBuf::as_path)
    }

    /// Spawn the executable detached; the assistant does not wait on it
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot be spawned
    pub fn launch(path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "opening application");

        let mut cmd = tokio::process::Command::new(path);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        cmd.spawn().map_err(|e| {
            Error::Provider(format!("failed to launch {}: {e}", path.display()))
        })?;
        Ok(())
    }
}
