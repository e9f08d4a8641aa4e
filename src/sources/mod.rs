/*!
Input sources module (orchestration layer).

This module defines the NDJSON input vocabulary, the `InputSource` trait and the
orchestration helpers (`build_sources_from_config`, `spawn_all_sources`, `forward`).
Concrete implementations live in their own files:

- `stdin_source.rs`  -> `StdinSource`   (NDJSON lines from standard input)
- `replay.rs`        -> `ReplaySource`  (NDJSON lines from a file, honouring `after_ms`)
- `config_watch.rs`  -> `ConfigWatcher` (reload the configuration when its file changes)

Every line is one of:

```text
{"type":"pointer","element":"ok","event":{"kind":"down","x":0,"y":0}}
{"type":"state","entity_id":"light.den","state":"on","attributes":{"brightness":128}}
{"type":"reset","element":"ok"}
{"type":"text","text":"hello"}
{"type":"key_down","key":"Backspace"}
```

and may carry `"after_ms": <n>`, a delay applied before the line is delivered.

Sources push `InputLine`s; `forward` turns them into runtime [`Input`]s, applying
state lines to the shared [`MemoryStates`] first. Malformed lines are logged and
skipped; a closed channel ends the task.
*/

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::mpsc::{Receiver, Sender},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, trace, warn};

use crate::config::{RemoteConfig, SourceConfig};
use crate::executor::Input;
use crate::gesture::PointerEvent;
use crate::host::{EntityState, MemoryStates};

pub mod config_watch;
pub mod replay;
pub mod stdin_source;

pub use config_watch::ConfigWatcher;
pub use replay::ReplaySource;
pub use stdin_source::StdinSource;

/// One NDJSON input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputLine {
    Pointer {
        element: String,
        event: PointerEvent,
    },
    State {
        entity_id: String,
        #[serde(flatten)]
        state: EntityState,
    },
    Reset {
        #[serde(default)]
        element: Option<String>,
    },
    /// Typed or pasted text.
    Text {
        text: String,
    },
    KeyDown {
        key: String,
    },
}

/// An input line plus its optional delivery delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_ms: Option<u64>,
    #[serde(flatten)]
    pub line: InputLine,
}

/// Parse one raw NDJSON line. Blank lines and `#` comments yield `None`.
pub fn parse_line(raw: &str) -> Option<TimedLine> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    match serde_json::from_str::<TimedLine>(raw) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(
                target: "remotekit::sources",
                error = %e,
                line = raw,
                "Failed to parse input line"
            );
            None
        }
    }
}

/// Wait out `after_ms`, then send. Returns false once the receiver is gone.
pub(crate) async fn deliver(sender: &Sender<InputLine>, timed: TimedLine) -> bool {
    if let Some(ms) = timed.after_ms.filter(|ms| *ms > 0) {
        trace!(target: "remotekit::sources", after_ms = ms, "delaying input line");
        sleep(Duration::from_millis(ms)).await;
    }
    sender.send(timed.line).await.is_ok()
}

/// Trait implemented by all line sources.
///
/// A source spawns a task producing `InputLine`s into the channel. Tasks never
/// panic; they log and continue, or exit on unrecoverable errors.
pub trait InputSource: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Start the source in the background.
    fn start(&self, sender: Sender<InputLine>) -> JoinHandle<()>;
}

/// Construct all configured sources, in configuration order.
pub fn build_sources_from_config(cfg: &RemoteConfig) -> Vec<Box<dyn InputSource>> {
    cfg.sources
        .iter()
        .map(|sc| -> Box<dyn InputSource> {
            match sc {
                SourceConfig::Stdin => Box::new(StdinSource::new()),
                SourceConfig::Replay { path } => Box::new(ReplaySource::new(path.clone())),
            }
        })
        .collect()
}

/// Spawn every source, returning their `JoinHandle`s.
pub fn spawn_all_sources(
    sources: &[Box<dyn InputSource>],
    sender: Sender<InputLine>,
) -> Vec<JoinHandle<()>> {
    sources
        .iter()
        .map(|src| {
            info!(
                target: "remotekit::sources",
                source = %src.name(),
                "Starting source task"
            );
            src.start(sender.clone())
        })
        .collect()
}

/// Map input lines to runtime inputs until either side closes.
///
/// State lines update `states` and then announce `StatesChanged`.
pub async fn forward(
    mut lines: Receiver<InputLine>,
    states: Arc<MemoryStates>,
    inputs: Sender<Input>,
) {
    while let Some(line) = lines.recv().await {
        let input = match line {
            InputLine::Pointer { element, event } => Input::Pointer { element, event },
            InputLine::State { entity_id, state } => {
                debug!(target: "remotekit::sources", entity = %entity_id, state = %state.state, "state update");
                states.set(entity_id, state);
                Input::StatesChanged
            }
            InputLine::Reset { element } => Input::Reset { element },
            InputLine::Text { text } => Input::Text { text },
            InputLine::KeyDown { key } => Input::KeyDown { key },
        };
        if inputs.send(input).await.is_err() {
            debug!(target: "remotekit::sources", "Runtime gone; forwarder exiting");
            break;
        }
    }
}
