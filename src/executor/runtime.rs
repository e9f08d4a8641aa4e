use anyhow::Result;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::dispatch::Dispatcher;
use super::element::{RemoteElement, Scheduler};
use crate::config::RemoteConfig;
use crate::gesture::{PointerEvent, TimerId, TimerKind};
use crate::host::Host;
use crate::tracker::VALUE_TICK;

/// Input accepted by the [`Runtime`].
#[derive(Debug, Clone)]
pub enum Input {
    /// Pointer event for one element.
    Pointer { element: String, event: PointerEvent },
    /// Entity states changed; re-read every tracked value.
    StatesChanged,
    /// Replace every element's configuration wholesale.
    Reconfigure(Box<RemoteConfig>),
    /// Reset one element (or all of them) to idle.
    Reset { element: Option<String> },
    /// Text typed or pasted into the remote's text field.
    Text { text: String },
    /// Non-printing key pressed in the remote's text field (`Backspace`, `Enter`, ...).
    KeyDown { key: String },
}

/// Messages produced by the runtime's own tasks.
#[derive(Debug)]
enum Internal {
    Timer { element: String, timer: TimerId },
    ValueTick { element: String },
}

/// Timer backend: one sleeping task per live (element, kind).
struct TaskScheduler {
    tx: UnboundedSender<Internal>,
    live: HashMap<(String, TimerKind), (TimerId, JoinHandle<()>)>,
}

impl TaskScheduler {
    fn new(tx: UnboundedSender<Internal>) -> Self {
        Self {
            tx,
            live: HashMap::new(),
        }
    }

    /// Forget a timer whose message arrived. Returns false if it was cancelled or replaced.
    fn take(&mut self, element: &str, timer: TimerId) -> bool {
        let key = (element.to_string(), timer.kind);
        match self.live.get(&key) {
            Some((id, _)) if *id == timer => {
                self.live.remove(&key);
                true
            }
            _ => false,
        }
    }

    fn has_pending(&self, kind: TimerKind) -> bool {
        self.live.keys().any(|(_, k)| *k == kind)
    }

    fn abort_all(&mut self) {
        for (_, (_, handle)) in self.live.drain() {
            handle.abort();
        }
    }
}

impl Scheduler for TaskScheduler {
    fn arm(&mut self, element: &str, timer: TimerId, after: Duration) {
        let tx = self.tx.clone();
        let owner = element.to_string();
        let handle = tokio::spawn(async move {
            sleep(after).await;
            let _ = tx.send(Internal::Timer {
                element: owner,
                timer,
            });
        });
        trace!(
            target: "remotekit::runtime",
            element, timer = timer.kind.as_str(), generation = timer.generation, ?after,
            "timer armed"
        );
        if let Some((_, old)) = self
            .live
            .insert((element.to_string(), timer.kind), (timer, handle))
        {
            old.abort();
        }
    }

    fn cancel(&mut self, element: &str, timer: TimerId) {
        let key = (element.to_string(), timer.kind);
        if matches!(self.live.get(&key), Some((id, _)) if *id == timer) {
            if let Some((_, handle)) = self.live.remove(&key) {
                handle.abort();
            }
        }
    }
}

/// Event loop owning every element of one remote.
///
/// - pointer inputs are routed to their element in arrival order
/// - timers run as sleeping tasks and come back through an internal channel
/// - animated values are re-read by per-element tickers
/// - reconfiguration resets everything before swapping the elements
pub struct Runtime {
    host: Host,
    config: RemoteConfig,
    dispatcher: Arc<Dispatcher>,
    elements: BTreeMap<String, RemoteElement>,
    scheduler: TaskScheduler,
    tickers: HashMap<String, (String, CancellationToken)>,
    internal_tx: UnboundedSender<Internal>,
    internal_rx: UnboundedReceiver<Internal>,
}

impl Runtime {
    pub fn new(config: RemoteConfig, host: Host) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Dispatcher::new(host.clone(), &config));
        let elements = build_elements(&config, &dispatcher);
        info!(
            target: "remotekit::runtime",
            elements = elements.len(),
            "Runtime created"
        );
        Self {
            host,
            config,
            dispatcher,
            elements,
            scheduler: TaskScheduler::new(internal_tx.clone()),
            tickers: HashMap::new(),
            internal_tx,
            internal_rx,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn element(&self, id: &str) -> Option<&RemoteElement> {
        self.elements.get(id)
    }

    /// Process inputs until the channel closes.
    ///
    /// At end of input, pending tap windows still complete; presses that are still
    /// held are cancelled.
    pub async fn run(mut self, mut inputs: Receiver<Input>) -> Result<()> {
        self.refresh_values();

        loop {
            tokio::select! {
                biased;
                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),
                input = inputs.recv() => match input {
                    Some(input) => self.handle(input),
                    None => break,
                },
            }
        }

        debug!(target: "remotekit::runtime", "Input closed; settling pending tap windows");
        while self.scheduler.has_pending(TimerKind::TapWindow) {
            match self.internal_rx.recv().await {
                Some(internal) => self.handle_internal(internal),
                None => break,
            }
        }

        self.shutdown();
        info!(target: "remotekit::runtime", "Runtime stopped");
        Ok(())
    }

    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Pointer { element, event } => {
                let Some(el) = self.elements.get_mut(&element) else {
                    warn!(target: "remotekit::runtime", %element, "Pointer event for unknown element");
                    return;
                };
                let at = Instant::now().into_std();
                if let Err(err) = el.pointer(event, at, &mut self.scheduler) {
                    error!(target: "remotekit::runtime", %element, error = %err, "Gesture dispatch failed");
                }
            }
            Input::StatesChanged => self.refresh_values(),
            Input::Reconfigure(config) => self.reconfigure(*config),
            Input::Reset { element: Some(id) } => match self.elements.get_mut(&id) {
                Some(el) => el.reset(&mut self.scheduler),
                None => warn!(target: "remotekit::runtime", element = %id, "Reset for unknown element"),
            },
            Input::Reset { element: None } => {
                for el in self.elements.values_mut() {
                    el.reset(&mut self.scheduler);
                }
            }
            Input::Text { text } => {
                if let Err(err) = self.dispatcher.send_text(&text) {
                    error!(target: "remotekit::runtime", error = %err, "Text input failed");
                }
            }
            Input::KeyDown { key } => {
                if let Err(err) = self.dispatcher.key_down(&key) {
                    error!(target: "remotekit::runtime", %key, error = %err, "Key input failed");
                }
            }
        }
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Timer { element, timer } => {
                if !self.scheduler.take(&element, timer) {
                    trace!(target: "remotekit::runtime", %element, "dropping cancelled timer message");
                    return;
                }
                let Some(el) = self.elements.get_mut(&element) else {
                    return;
                };
                let at = Instant::now().into_std();
                if let Err(err) = el.timer(timer, at, &mut self.scheduler) {
                    error!(target: "remotekit::runtime", %element, error = %err, "Gesture dispatch failed");
                }
            }
            Internal::ValueTick { element } => self.refresh_value(&element),
        }
    }

    fn reconfigure(&mut self, config: RemoteConfig) {
        info!(
            target: "remotekit::runtime",
            elements = config.elements.len(),
            "Reconfiguring"
        );
        self.shutdown();
        self.dispatcher = Arc::new(Dispatcher::new(self.host.clone(), &config));
        self.elements = build_elements(&config, &self.dispatcher);
        self.config = config;
        self.refresh_values();
    }

    fn refresh_values(&mut self) {
        let ids: Vec<String> = self.elements.keys().cloned().collect();
        for id in ids {
            self.refresh_value(&id);
        }
    }

    fn refresh_value(&mut self, id: &str) {
        let Some(el) = self.elements.get_mut(id) else {
            return;
        };
        let Some(reading) = el.refresh_value(Utc::now()) else {
            return;
        };
        let entity = el
            .tracker()
            .map(|t| t.entity_id().to_string())
            .unwrap_or_default();

        match (reading.animated, self.tickers.get(id)) {
            (true, Some((current, _))) if *current == entity => {}
            (true, _) => self.start_ticker(id, entity),
            (false, Some(_)) => self.stop_ticker(id),
            (false, None) => {}
        }
    }

    fn start_ticker(&mut self, id: &str, entity: String) {
        self.stop_ticker(id);
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.internal_tx.clone();
        let element = id.to_string();
        tokio::spawn(async move {
            let mut ticks = interval(VALUE_TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks.tick().await;
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticks.tick() => {
                        if tx.send(Internal::ValueTick { element: element.clone() }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        debug!(target: "remotekit::runtime", element = %id, %entity, "value ticker started");
        self.tickers.insert(id.to_string(), (entity, token));
    }

    fn stop_ticker(&mut self, id: &str) {
        if let Some((entity, token)) = self.tickers.remove(id) {
            token.cancel();
            debug!(target: "remotekit::runtime", element = %id, %entity, "value ticker stopped");
        }
    }

    /// Reset every element and tear down all timers and tickers.
    fn shutdown(&mut self) {
        for el in self.elements.values_mut() {
            el.reset(&mut self.scheduler);
        }
        self.scheduler.abort_all();
        for (_, (_, token)) in self.tickers.drain() {
            token.cancel();
        }
    }
}

fn build_elements(
    config: &RemoteConfig,
    dispatcher: &Arc<Dispatcher>,
) -> BTreeMap<String, RemoteElement> {
    config
        .elements
        .iter()
        .map(|(id, cfg)| {
            (
                id.clone(),
                RemoteElement::new(id.clone(), cfg, config, dispatcher.clone()),
            )
        })
        .collect()
}
