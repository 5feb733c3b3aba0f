//! Watches the options file for edits made outside the host

use std::path::{Path, PathBuf};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Receiver, error::TryRecvError};

use crate::error::ConfigError;

const CHANNEL_CAPACITY: usize = 16;

/// Reports changes to one options file.
///
/// notify delivers on its own thread; changes are queued and drained by the
/// host on the surface thread, which then reloads and broadcasts a refresh.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(config_path: &Path) -> Result<Self, ConfigError> {
        let dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let file_name = config_path.file_name().map(|name| name.to_os_string());
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && is_content_change(&event.kind) {
                        // A full queue already holds a pending change
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => tracing::warn!(error = %e, "config watcher error"),
            },
            Config::default(),
        )
        .map_err(|source| ConfigError::Watch {
            path: dir.clone(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| ConfigError::Watch {
                path: dir.clone(),
                source,
            })?;

        tracing::debug!(path = %config_path.display(), "watching options file");

        Ok(Self {
            _watcher: watcher,
            rx,
            path: config_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain queued notifications; true if the file changed since last call
    pub fn take_changed(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(()) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::time::{Duration, Instant};

    #[test]
    fn test_content_change_kinds() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_content_change(&EventKind::Access(
            notify::event::AccessKind::Any
        )));
    }

    #[test]
    fn test_no_changes_initially() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "enabled = true\n").unwrap();

        let mut watcher = ConfigWatcher::new(&path).unwrap();
        assert_eq!(watcher.path(), path.as_path());
        assert!(!watcher.take_changed());
    }

    #[test]
    fn test_edit_to_options_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "enabled = true\n").unwrap();
        let mut watcher = ConfigWatcher::new(&path).unwrap();

        std::fs::write(dir.path().join("unrelated.toml"), "x = 1\n").unwrap();
        std::fs::write(&path, "enabled = false\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while !seen && Instant::now() < deadline {
            seen = watcher.take_changed();
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(seen, "edit to the options file was not reported");
    }
}
