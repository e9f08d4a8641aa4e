/*!
Gesture recognition core.

Every interactive element owns exactly one [`Recognizer`]. A recognizer is a pure
state machine: it never sleeps and never dispatches. It consumes pointer events and
timer expirations (each stamped with the instant they happened) and answers with a
list of [`Intent`]s for the adapter layer:

- `Arm` / `Cancel` a timer (hold-detect, repeat tick, tap window)
- forward a `Haptic` cue
- `Fire` a high-level trigger (an action slot for buttons, a named action for the touchpad)

Timer ids carry a generation; an expiration whose generation is no longer the live
one is ignored, so a callback scheduled before a cancellation can never act after it.

Implementations:
- `button`   -> `ButtonGesture`   (tap / double tap / hold / repeat / momentary / swipe)
- `touchpad` -> `TouchpadGesture` (click / double click / long click / directional repeat)
*/

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::ActionSlot;

pub mod button;
pub mod timers;
pub mod touchpad;

#[cfg(test)]
pub(crate) mod sim;

pub use button::{ButtonGesture, ButtonPhase, ButtonPlan};
pub use timers::{TimerId, TimerKind};
pub use touchpad::{Direction, TouchpadGesture, TouchpadPhase, TouchpadPlan};

/// Default delay before a press counts as a hold.
pub const DEFAULT_HOLD_DELAY: Duration = Duration::from_millis(500);
/// Default interval between repeat ticks.
pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_millis(100);
/// Default window in which a second release merges into a double tap.
pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(200);
/// Default swipe sensitivity threshold.
pub const DEFAULT_SENSITIVITY: f64 = 8.0;

/// Raw pointer input, already mapped to element-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        x: f64,
        y: f64,
        /// Number of simultaneous touch points.
        #[serde(default = "single_touch")]
        touches: u8,
    },
    Move {
        x: f64,
        y: f64,
    },
    Up,
    /// The pointer left the element bounds.
    Leave,
    /// The host cancelled the gesture (e.g. the touch was stolen by a scroll).
    Cancel,
}

fn single_touch() -> u8 {
    1
}

impl PointerEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self::Down { x, y, touches: 1 }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down { .. } => "down",
            Self::Move { .. } => "move",
            Self::Up => "up",
            Self::Leave => "leave",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Feedback intensity forwarded to the haptic sink.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Haptic {
    Light,
    Medium,
    Heavy,
    Selection,
    Success,
    Warning,
    Failure,
}

impl Haptic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
            Self::Selection => "selection",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
        }
    }
}

/// What a recognized gesture asks the element to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// A slot of the element's action set.
    Slot(ActionSlot),
    /// A named action resolved through the key tables.
    Named { name: String, long_press: bool },
}

/// A recognized gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub trigger: Trigger,
    pub haptic: Haptic,
    /// Momentary hold duration in seconds (0 outside the momentary pair).
    pub hold_secs: f64,
}

/// Instruction from a recognizer to its adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Arm { timer: TimerId, after: Duration },
    Cancel { timer: TimerId },
    Haptic(Haptic),
    Fire(Firing),
}

impl Intent {
    pub(crate) fn fire(trigger: Trigger, haptic: Haptic) -> Self {
        Self::Fire(Firing {
            trigger,
            haptic,
            hold_secs: 0.0,
        })
    }
}

/// Per-element gesture state machine.
pub trait Recognizer: Send {
    /// Static identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Feed a pointer event.
    fn pointer(&mut self, event: PointerEvent, at: Instant) -> Vec<Intent>;

    /// Feed a timer expiration. Stale ids yield no intents.
    fn timer_fired(&mut self, timer: TimerId, at: Instant) -> Vec<Intent>;

    /// Return to idle, cancelling every live timer. Idempotent.
    fn reset(&mut self) -> Vec<Intent>;

    /// Idle with no live timer.
    fn is_idle(&self) -> bool;

    /// Swap in freshly resolved button timings before a press. Only applied while idle;
    /// recognizers without button timings ignore it.
    fn replan(&mut self, _plan: ButtonPlan) {}
}
