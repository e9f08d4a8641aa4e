#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for remotekit.

This module wires together:
- `resolver`: slot fallback chains and named key / source lookup
- `confirm`: the confirmation gate run before any command leaves the crate
- `dispatch`: turning an action descriptor into a host [`Command`](crate::host::Command)
- `element`: one interactive element (recognizer + actions + value tracker)
- `runtime`: the tokio event loop driving every element, its timers and value tickers

Typical usage:
- Load a `RemoteConfig` and build a [`Host`](crate::host::Host).
- Construct a `Runtime` and feed it [`Input`]s through a channel.

Example:
```no_run
use remotekit::config::RemoteConfig;
use remotekit::executor::{Input, Runtime};
use remotekit::host::{AutoPrompter, Host, MemoryStates};
use std::sync::Arc;

# async fn demo() -> anyhow::Result<()> {
let host = Host::console(true, Arc::new(MemoryStates::new()), Arc::new(AutoPrompter(true)), None);
let (tx, rx) = tokio::sync::mpsc::channel::<Input>(64);
let run = tokio::spawn(Runtime::new(RemoteConfig::default(), host).run(rx));
drop(tx);
run.await??;
# Ok(())
# }
```
*/

pub mod confirm;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod resolver;
pub mod runtime;

// Re-exports for convenient access from `remotekit::executor::*`
pub use dispatch::{Dispatch, Dispatcher};
pub use element::{RemoteElement, Scheduler};
pub use error::DispatchError;
pub use resolver::KeyMap;
pub use runtime::{Input, Runtime};
