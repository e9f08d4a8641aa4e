//! Touchpad gesture recognition.
//!
//! A press that moves is classified once into a direction and sends that direction.
//! Kept pressed past the long-press delay, a directed press auto-repeats its direction;
//! an undirected one sends the long-click target instead. A press released early with
//! no direction is a click, optionally merged into a double click.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::timers::TimerSlots;
use super::{
    DEFAULT_DOUBLE_TAP_WINDOW, DEFAULT_HOLD_DELAY, DEFAULT_REPEAT_INTERVAL, Haptic, Intent, Point,
    PointerEvent, Recognizer, TimerId, TimerKind, Trigger,
};
use crate::config::TouchpadConfig;

const CLICK_TARGET: &str = "center";
const DEFAULT_DOUBLE_CLICK_TARGET: &str = "back";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Classify a displacement (`origin - current`) by its dominant axis.
    pub fn classify(dx: f64, dy: f64) -> Self {
        if dx.abs() > dy.abs() {
            if dx > 0.0 { Self::Left } else { Self::Right }
        } else if dy > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchpadPlan {
    pub double_click: bool,
    pub double_click_target: String,
    /// `None` sends `center` as a long press.
    pub long_click_target: Option<String>,
    pub long_press: Duration,
    pub repeat_interval: Duration,
    pub double_click_window: Duration,
    pub swipe_threshold: f64,
}

impl Default for TouchpadPlan {
    fn default() -> Self {
        Self {
            double_click: false,
            double_click_target: DEFAULT_DOUBLE_CLICK_TARGET.to_string(),
            long_click_target: None,
            long_press: DEFAULT_HOLD_DELAY,
            repeat_interval: DEFAULT_REPEAT_INTERVAL,
            double_click_window: DEFAULT_DOUBLE_TAP_WINDOW,
            swipe_threshold: 0.0,
        }
    }
}

impl From<&TouchpadConfig> for TouchpadPlan {
    fn from(cfg: &TouchpadConfig) -> Self {
        let defaults = Self::default();
        Self {
            double_click: cfg.enable_double_click,
            double_click_target: cfg
                .double_click_keycode
                .clone()
                .unwrap_or(defaults.double_click_target),
            long_click_target: cfg.long_click_keycode.clone(),
            long_press: cfg
                .long_press_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.long_press),
            repeat_interval: cfg
                .repeat_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.repeat_interval),
            double_click_window: cfg
                .double_click_window_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.double_click_window),
            swipe_threshold: cfg.swipe_threshold.unwrap_or(defaults.swipe_threshold),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TouchpadPhase {
    Idle,
    Touching,
    /// A direction was sent during this press.
    Directed(Direction),
    /// Long click sent; release is suppressed.
    LongPress,
    Repeating(Direction),
    AwaitingSecondClick,
    SecondTouch,
}

#[derive(Debug)]
pub struct TouchpadGesture {
    plan: TouchpadPlan,
    phase: TouchpadPhase,
    timers: TimerSlots,
    origin: Option<Point>,
    clicks: u32,
}

impl TouchpadGesture {
    pub fn new(plan: TouchpadPlan) -> Self {
        Self {
            plan,
            phase: TouchpadPhase::Idle,
            timers: TimerSlots::default(),
            origin: None,
            clicks: 0,
        }
    }

    pub fn phase(&self) -> TouchpadPhase {
        self.phase
    }

    fn send(&self, name: &str, long_press: bool, haptic: Haptic, out: &mut Vec<Intent>) {
        debug!(target: "remotekit::gesture", %name, long_press, "touchpad recognized");
        out.push(Intent::fire(
            Trigger::Named {
                name: name.to_string(),
                long_press,
            },
            haptic,
        ));
    }

    fn end(&mut self, out: &mut Vec<Intent>) {
        self.timers.cancel_all(out);
        self.phase = TouchpadPhase::Idle;
        self.origin = None;
        self.clicks = 0;
    }

    fn touch(&mut self, point: Point, out: &mut Vec<Intent>) {
        match self.phase {
            TouchpadPhase::AwaitingSecondClick => {
                self.phase = TouchpadPhase::SecondTouch;
                self.origin = Some(point);
                return;
            }
            TouchpadPhase::Idle => {}
            stale => {
                trace!(target: "remotekit::gesture", phase = ?stale, "touch while busy; resetting");
                self.end(out);
            }
        }
        self.origin = Some(point);
        self.phase = TouchpadPhase::Touching;
        self.timers
            .arm(TimerKind::HoldDetect, self.plan.long_press, out);
    }

    fn moved(&mut self, point: Point, out: &mut Vec<Intent>) {
        if !matches!(
            self.phase,
            TouchpadPhase::Touching | TouchpadPhase::SecondTouch
        ) {
            return;
        }
        let Some(origin) = self.origin else {
            return;
        };
        let dx = origin.x - point.x;
        let dy = origin.y - point.y;
        if dx == 0.0 && dy == 0.0 || dx.abs().max(dy.abs()) < self.plan.swipe_threshold {
            return;
        }

        let direction = Direction::classify(dx, dy);
        if self.phase == TouchpadPhase::SecondTouch {
            // A swipe abandons the pending click; this press starts fresh.
            self.timers.cancel(TimerKind::TapWindow, out);
            self.clicks = 0;
            self.timers
                .arm(TimerKind::HoldDetect, self.plan.long_press, out);
        }
        // One direction per press.
        self.origin = None;
        self.phase = TouchpadPhase::Directed(direction);
        self.send(direction.as_str(), false, Haptic::Selection, out);
    }

    fn release(&mut self, out: &mut Vec<Intent>) {
        match self.phase {
            TouchpadPhase::Touching => {
                self.timers.cancel(TimerKind::HoldDetect, out);
                self.click(out);
            }
            TouchpadPhase::SecondTouch => self.click(out),
            TouchpadPhase::Directed(_) | TouchpadPhase::LongPress | TouchpadPhase::Repeating(_) => {
                self.end(out)
            }
            TouchpadPhase::Idle | TouchpadPhase::AwaitingSecondClick => {}
        }
    }

    fn click(&mut self, out: &mut Vec<Intent>) {
        self.clicks += 1;
        if !self.plan.double_click {
            self.send(CLICK_TARGET, false, Haptic::Light, out);
            self.end(out);
        } else if self.clicks >= 2 {
            let target = self.plan.double_click_target.clone();
            self.send(&target, false, Haptic::Success, out);
            self.end(out);
        } else {
            self.phase = TouchpadPhase::AwaitingSecondClick;
            self.origin = None;
            self.timers
                .arm(TimerKind::TapWindow, self.plan.double_click_window, out);
        }
    }
}

impl Recognizer for TouchpadGesture {
    fn name(&self) -> &'static str {
        "touchpad"
    }

    fn pointer(&mut self, event: PointerEvent, _at: Instant) -> Vec<Intent> {
        let mut out = Vec::new();
        match event {
            PointerEvent::Down { x, y, .. } => self.touch(Point::new(x, y), &mut out),
            PointerEvent::Move { x, y } => self.moved(Point::new(x, y), &mut out),
            PointerEvent::Up => self.release(&mut out),
            PointerEvent::Leave | PointerEvent::Cancel => self.end(&mut out),
        }
        out
    }

    fn timer_fired(&mut self, timer: TimerId, _at: Instant) -> Vec<Intent> {
        let mut out = Vec::new();
        if !self.timers.accept(timer) {
            return out;
        }
        match (timer.kind, self.phase) {
            (TimerKind::HoldDetect, TouchpadPhase::Touching) => {
                self.phase = TouchpadPhase::LongPress;
                match self.plan.long_click_target.clone() {
                    Some(target) => self.send(&target, false, Haptic::Medium, &mut out),
                    None => self.send(CLICK_TARGET, true, Haptic::Medium, &mut out),
                }
            }
            (TimerKind::HoldDetect, TouchpadPhase::Directed(direction)) => {
                self.phase = TouchpadPhase::Repeating(direction);
                self.timers
                    .arm(TimerKind::Repeat, self.plan.repeat_interval, &mut out);
            }
            (TimerKind::Repeat, TouchpadPhase::Repeating(direction)) => {
                self.send(direction.as_str(), false, Haptic::Selection, &mut out);
                self.timers
                    .arm(TimerKind::Repeat, self.plan.repeat_interval, &mut out);
            }
            (
                TimerKind::TapWindow,
                TouchpadPhase::AwaitingSecondClick | TouchpadPhase::SecondTouch,
            ) => {
                self.send(CLICK_TARGET, false, Haptic::Light, &mut out);
                self.end(&mut out);
            }
            (kind, phase) => {
                trace!(
                    target: "remotekit::gesture",
                    timer = kind.as_str(), ?phase,
                    "timer expired in unrelated phase"
                );
            }
        }
        out
    }

    fn reset(&mut self) -> Vec<Intent> {
        let mut out = Vec::new();
        self.end(&mut out);
        out
    }

    fn is_idle(&self) -> bool {
        self.phase == TouchpadPhase::Idle && self.timers.is_empty()
    }
}
