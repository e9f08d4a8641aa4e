//! Configuration file watcher.
//!
//! Watches the directory holding the configuration file (editors often replace files
//! by rename) and, after a short settle delay, reloads it and sends
//! [`Input::Reconfigure`]. A reload that fails to parse or validate is logged and the
//! running configuration stays in place.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{
    sync::mpsc::{self, Sender},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, trace, warn};

use crate::config;
use crate::executor::Input;

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    settle: Duration,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settle: DEFAULT_SETTLE,
        }
    }

    /// Delay between the first change notification and the reload.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Start watching. The returned task owns the OS watcher and ends when `sender` closes.
    pub fn start(&self, sender: Sender<Input>) -> Result<JoinHandle<()>> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.send(res);
        })
        .context("Failed to create file watcher")?;

        let dir = watch_dir(&self.path);
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        info!(target: "remotekit::sources", path = %self.path.display(), "Watching configuration");

        let path = self.path.clone();
        let settle = self.settle;
        Ok(tokio::spawn(async move {
            let _watcher = watcher;
            while let Some(res) = raw_rx.recv().await {
                match res {
                    Ok(event) if is_relevant(&event, &path) => {}
                    Ok(event) => {
                        trace!(target: "remotekit::sources", kind = ?event.kind, "ignoring watcher event");
                        continue;
                    }
                    Err(e) => {
                        warn!(target: "remotekit::sources", error = %e, "Watcher error");
                        continue;
                    }
                }

                sleep(settle).await;
                while raw_rx.try_recv().is_ok() {}

                match config::load_from_path_async(&path).await {
                    Ok(cfg) => {
                        debug!(target: "remotekit::sources", path = %path.display(), "Configuration reloaded");
                        if sender.send(Input::Reconfigure(Box::new(cfg))).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(
                        target: "remotekit::sources",
                        path = %path.display(), error = ?e,
                        "Reload failed; keeping the running configuration"
                    ),
                }
            }
            debug!(target: "remotekit::sources", "Config watcher ended");
        }))
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A create, modify or rename touching the watched file name.
fn is_relevant(event: &Event, path: &Path) -> bool {
    let touches_data = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    touches_data
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == path.file_name())
}
