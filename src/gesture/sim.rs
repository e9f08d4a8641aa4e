//! Deterministic virtual-clock driver for recognizers (tests only).

use std::time::{Duration, Instant};

use super::{Firing, Haptic, Intent, PointerEvent, Recognizer, TimerId, Trigger};
use crate::config::ActionSlot;

pub(crate) struct Sim<R: Recognizer> {
    pub machine: R,
    origin: Instant,
    now: Duration,
    pending: Vec<(Duration, TimerId)>,
    pub fired: Vec<Firing>,
    pub haptics: Vec<Haptic>,
}

impl<R: Recognizer> Sim<R> {
    pub fn new(machine: R) -> Self {
        Self {
            machine,
            origin: Instant::now(),
            now: Duration::ZERO,
            pending: Vec::new(),
            fired: Vec::new(),
            haptics: Vec::new(),
        }
    }

    pub fn at(&self) -> Instant {
        self.origin + self.now
    }

    pub fn send(&mut self, event: PointerEvent) {
        let intents = self.machine.pointer(event, self.at());
        self.apply(intents);
    }

    pub fn down(&mut self, x: f64, y: f64) {
        self.send(PointerEvent::down(x, y));
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.send(PointerEvent::Move { x, y });
    }

    pub fn up(&mut self) {
        self.send(PointerEvent::Up);
    }

    pub fn reset(&mut self) {
        let intents = self.machine.reset();
        self.apply(intents);
    }

    /// Deliver an expiration directly, bypassing the pending queue.
    pub fn deliver(&mut self, timer: TimerId) {
        let intents = self.machine.timer_fired(timer, self.at());
        self.apply(intents);
    }

    /// Advance the clock, firing due timers in deadline order.
    pub fn advance(&mut self, ms: u64) {
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
            let intents = self.machine.timer_fired(timer, self.at());
            self.apply(intents);
        }
        self.now = target;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn slots(&self) -> Vec<ActionSlot> {
        self.fired
            .iter()
            .filter_map(|f| match f.trigger {
                Trigger::Slot(slot) => Some(slot),
                Trigger::Named { .. } => None,
            })
            .collect()
    }

    pub fn names(&self) -> Vec<(String, bool)> {
        self.fired
            .iter()
            .filter_map(|f| match &f.trigger {
                Trigger::Named { name, long_press } => Some((name.clone(), *long_press)),
                Trigger::Slot(_) => None,
            })
            .collect()
    }

    pub fn count(&self, slot: ActionSlot) -> usize {
        self.slots().into_iter().filter(|s| *s == slot).count()
    }

    fn apply(&mut self, intents: Vec<Intent>) {
        for intent in intents {
            match intent {
                Intent::Arm { timer, after } => self.pending.push((self.now + after, timer)),
                Intent::Cancel { timer } => self.pending.retain(|(_, t)| *t != timer),
                Intent::Haptic(haptic) => self.haptics.push(haptic),
                Intent::Fire(firing) => {
                    self.haptics.push(firing.haptic);
                    self.fired.push(firing);
                }
            }
        }
    }
}
