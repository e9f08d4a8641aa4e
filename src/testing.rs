//! Recording collaborators and a virtual scheduler for unit tests.

use anyhow::{Result, bail};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::executor::element::{RemoteElement, Scheduler};
use crate::executor::DispatchError;
use crate::gesture::{Haptic, PointerEvent, TimerId};
use crate::host::{
    Command, CommandSurface, HapticSink, Host, MemoryStates, Prompter, StaticIdentity,
};
use crate::utils::interpolation::Interpolator;

#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    commands: Mutex<Vec<Command>>,
    failing: AtomicBool,
}

impl RecordingSurface {
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl CommandSurface for RecordingSurface {
    fn execute(&self, command: &Command) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("surface unavailable");
        }
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedPrompter {
    answer: Option<bool>,
    typed: Mutex<Option<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            typed: Mutex::new(None),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            typed: Mutex::new(None),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Text returned by the next text prompts.
    pub fn type_text(&self, text: Option<&str>) {
        *self.typed.lock().unwrap() = text.map(str::to_string);
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, text: &str) -> Result<bool> {
        self.asked.lock().unwrap().push(text.to_string());
        match self.answer {
            Some(answer) => Ok(answer),
            None => bail!("no terminal"),
        }
    }

    fn text(&self, label: &str) -> Result<Option<String>> {
        self.asked.lock().unwrap().push(label.to_string());
        match self.answer {
            Some(_) => Ok(self.typed.lock().unwrap().clone()),
            None => bail!("no terminal"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingHaptics {
    seen: Mutex<Vec<Haptic>>,
}

impl RecordingHaptics {
    pub fn seen(&self) -> Vec<Haptic> {
        self.seen.lock().unwrap().clone()
    }
}

impl HapticSink for RecordingHaptics {
    fn feedback(&self, haptic: Haptic) {
        self.seen.lock().unwrap().push(haptic);
    }
}

/// A [`Host`] whose collaborators can be inspected.
pub(crate) struct TestHost {
    pub host: Host,
    pub surface: Arc<RecordingSurface>,
    pub prompter: Arc<ScriptedPrompter>,
    pub haptics: Arc<RecordingHaptics>,
    pub states: Arc<MemoryStates>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::build(ScriptedPrompter::answering(true), None)
    }

    pub fn with_failing_prompter() -> Self {
        Self::build(ScriptedPrompter::failing(), None)
    }

    pub fn answering(self, answer: bool) -> Self {
        Self::build(ScriptedPrompter::answering(answer), self.host.identity.user_id())
    }

    pub fn with_user(self, user: &str) -> Self {
        let answer = self.prompter.answer.unwrap_or(true);
        Self::build(ScriptedPrompter::answering(answer), Some(user.to_string()))
    }

    fn build(prompter: ScriptedPrompter, user: Option<String>) -> Self {
        let surface = Arc::new(RecordingSurface::default());
        let prompter = Arc::new(prompter);
        let haptics = Arc::new(RecordingHaptics::default());
        let states = Arc::new(MemoryStates::new());
        let host = Host {
            surface: surface.clone(),
            states: states.clone(),
            templates: Arc::new(Interpolator),
            prompter: prompter.clone(),
            identity: Arc::new(StaticIdentity::new(user)),
            haptics: haptics.clone(),
        };
        Self {
            host,
            surface,
            prompter,
            haptics,
            states,
        }
    }
}

/// Deterministic scheduler driving one [`RemoteElement`] on a virtual clock.
pub(crate) struct VirtualScheduler {
    origin: Instant,
    now: Duration,
    pending: Vec<(Duration, TimerId)>,
}

impl Scheduler for VirtualScheduler {
    fn arm(&mut self, _element: &str, timer: TimerId, after: Duration) {
        self.pending.push((self.now + after, timer));
    }

    fn cancel(&mut self, _element: &str, timer: TimerId) {
        self.pending.retain(|(_, t)| *t != timer);
    }
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            now: Duration::ZERO,
            pending: Vec::new(),
        }
    }

    pub fn at(&self) -> Instant {
        self.origin + self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn send(
        &mut self,
        element: &mut RemoteElement,
        event: PointerEvent,
    ) -> Result<(), DispatchError> {
        let at = self.at();
        element.pointer(event, at, self)
    }

    /// Advance the clock, delivering due timers in deadline order. Stops at the first error.
    pub fn advance(&mut self, element: &mut RemoteElement, ms: u64) -> Result<(), DispatchError> {
        let target = self.now + Duration::from_millis(ms);
        loop {
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, (due, _))| *due <= target)
                .min_by_key(|(_, (due, _))| *due)
                .map(|(idx, _)| idx);
            let Some(idx) = next else { break };
            let (due, timer) = self.pending.remove(idx);
            self.now = due;
            let at = self.at();
            element.timer(timer, at, self)?;
        }
        self.now = target;
        Ok(())
    }
}
