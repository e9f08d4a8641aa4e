//! Timer bookkeeping shared by the recognizers.
//!
//! A recognizer holds at most one live timer per [`TimerKind`]. Arming a kind that is
//! already live cancels the old one first. Every arm draws a fresh generation from a
//! per-recognizer counter, and an expiration is only accepted when its generation is
//! the live one for that kind.

use std::time::Duration;
use tracing::trace;

use super::Intent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Press sustained long enough to count as a hold / long press.
    HoldDetect,
    /// Repeat tick while held.
    Repeat,
    /// Double-tap / double-click window after the first release.
    TapWindow,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoldDetect => "hold_detect",
            Self::Repeat => "repeat",
            Self::TapWindow => "tap_window",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct TimerSlots {
    generation: u64,
    hold: Option<u64>,
    repeat: Option<u64>,
    window: Option<u64>,
}

impl TimerSlots {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<u64> {
        match kind {
            TimerKind::HoldDetect => &mut self.hold,
            TimerKind::Repeat => &mut self.repeat,
            TimerKind::TapWindow => &mut self.window,
        }
    }

    pub(crate) fn arm(&mut self, kind: TimerKind, after: Duration, out: &mut Vec<Intent>) {
        self.cancel(kind, out);
        self.generation = self.generation.saturating_add(1);
        let generation = self.generation;
        *self.slot(kind) = Some(generation);
        trace!(target: "remotekit::gesture", timer = kind.as_str(), generation, ?after, "arm");
        out.push(Intent::Arm {
            timer: TimerId { kind, generation },
            after,
        });
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind, out: &mut Vec<Intent>) {
        if let Some(generation) = self.slot(kind).take() {
            trace!(target: "remotekit::gesture", timer = kind.as_str(), generation, "cancel");
            out.push(Intent::Cancel {
                timer: TimerId { kind, generation },
            });
        }
    }

    pub(crate) fn cancel_all(&mut self, out: &mut Vec<Intent>) {
        self.cancel(TimerKind::HoldDetect, out);
        self.cancel(TimerKind::Repeat, out);
        self.cancel(TimerKind::TapWindow, out);
    }

    /// Consume an expiration. Returns false for stale or unknown ids.
    pub(crate) fn accept(&mut self, timer: TimerId) -> bool {
        let slot = self.slot(timer.kind);
        if *slot == Some(timer.generation) {
            *slot = None;
            true
        } else {
            trace!(
                target: "remotekit::gesture",
                timer = timer.kind.as_str(), generation = timer.generation,
                "ignoring stale timer"
            );
            false
        }
    }

    pub(crate) fn is_live(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::HoldDetect => self.hold.is_some(),
            TimerKind::Repeat => self.repeat.is_some(),
            TimerKind::TapWindow => self.window.is_some(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hold.is_none() && self.repeat.is_none() && self.window.is_none()
    }
}
