use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TicketTimerError};

/// Looks executables up on a PATH value captured at startup.
///
/// Lookups are never cached, so a tool installed between runs is picked up.
#[derive(Debug, Clone, Default)]
pub struct DependencyGate {
    path_env: Option<OsString>,
}

impl DependencyGate {
    pub fn new(path_env: Option<OsString>) -> Self {
        Self { path_env }
    }

    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.components().count() > 1 {
            return is_executable(direct).then(|| direct.to_path_buf());
        }
        let path_env = self.path_env.as_ref()?;
        std::env::split_paths(path_env).find_map(|dir| {
            let dir = if dir.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                dir
            };
            executable_names(name)
                .into_iter()
                .map(|candidate| dir.join(candidate))
                .find(|candidate| is_executable(candidate))
        })
    }

    /// Resolves every name, in order, or fails on the first missing one.
    pub fn ensure(&self, names: &[&str]) -> Result<Vec<PathBuf>> {
        names
            .iter()
            .map(|name| {
                let path = self
                    .find(name)
                    .ok_or_else(|| TicketTimerError::MissingDependency((*name).to_string()))?;
                debug!(name, path = %path.display(), "dependency found");
                Ok(path)
            })
            .collect()
    }
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    if Path::new(name).extension().is_some() {
        return vec![name.to_string()];
    }
    ["exe", "cmd", "bat"]
        .iter()
        .map(|ext| format!("{name}.{ext}"))
        .collect()
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn touch(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn finds_executable_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = touch(dir.path(), "toggl", 0o755);
        let gate = DependencyGate::new(Some(dir.path().as_os_str().to_owned()));
        assert_eq!(gate.find("toggl"), Some(tool.clone()));
        assert_eq!(gate.ensure(&["toggl"]).unwrap(), vec![tool]);
    }

    #[test]
    fn non_executable_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "toggl", 0o644);
        let gate = DependencyGate::new(Some(dir.path().as_os_str().to_owned()));
        assert!(gate.find("toggl").is_none());
    }

    #[test]
    fn ensure_reports_first_missing_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "toggl", 0o755);
        let gate = DependencyGate::new(Some(dir.path().as_os_str().to_owned()));
        match gate.ensure(&["toggl", "zendesk"]) {
            Err(TicketTimerError::MissingDependency(name)) => assert_eq!(name, "zendesk"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn searches_directories_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(second.path(), "toggl", 0o755);
        let winner = touch(first.path(), "toggl", 0o755);
        let joined = std::env::join_paths([first.path(), second.path()]).unwrap();
        let gate = DependencyGate::new(Some(joined));
        assert_eq!(gate.find("toggl"), Some(winner));
    }

    #[test]
    fn explicit_path_bypasses_search() {
        let dir = tempfile::tempdir().unwrap();
        let tool = touch(dir.path(), "tracker", 0o755);
        let gate = DependencyGate::new(None);
        assert_eq!(gate.find(tool.to_str().unwrap()), Some(tool));
    }

    #[test]
    fn no_path_means_nothing_found() {
        assert!(DependencyGate::new(None).find("sh").is_none());
    }
}
