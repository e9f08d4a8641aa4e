//! Replay input source.
//!
//! Reads a recorded NDJSON session from a file and forwards it line by line,
//! sleeping `after_ms` before each line that carries one. Useful for scripted
//! gesture sequences (press, wait, release) without a live pointer.
//!
//! A missing or unreadable file is logged and the task ends without sending anything.

use tokio::{fs::File, io::BufReader, sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info};

use super::stdin_source::pump;
use super::{InputLine, InputSource};

/// Source that replays an NDJSON file.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    path: String,
}

impl ReplaySource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl InputSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn start(&self, sender: Sender<InputLine>) -> JoinHandle<()> {
        let path = self.path.clone();
        tokio::spawn(async move {
            info!(target: "remotekit::sources", %path, "ReplaySource task started");
            let file = match File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    error!(target: "remotekit::sources", %path, error = %e, "Failed to open replay file");
                    return;
                }
            };
            let forwarded = pump(BufReader::new(file), &sender, &path).await;
            info!(target: "remotekit::sources", %path, forwarded, "ReplaySource task ended");
        })
    }
}
