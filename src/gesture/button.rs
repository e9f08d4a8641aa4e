//! Button gesture recognition.
//!
//! Turns a pointer-down → [move]* → pointer-up sequence into at most one of: tap,
//! double tap, hold, repeated taps, a momentary start/end pair, or nothing (swipe,
//! leave, cancel).

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::timers::TimerSlots;
use super::{
    DEFAULT_DOUBLE_TAP_WINDOW, DEFAULT_HOLD_DELAY, DEFAULT_REPEAT_INTERVAL, DEFAULT_SENSITIVITY,
    Firing, Haptic, Intent, Point, PointerEvent, Recognizer, TimerId, TimerKind, Trigger,
};
use crate::config::{ActionDescriptor, ActionSet, ActionSlot, Millis};

/// Which policies apply to a button, derived once from its [`ActionSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonPlan {
    pub momentary_start: bool,
    pub momentary_end: bool,
    pub double_tap: bool,
    pub multi_double_tap: bool,
    pub hold_repeats: bool,
    pub multi_hold_repeats: bool,
    pub hold_delay: Duration,
    pub repeat_interval: Duration,
    /// Hold delay for multi-touch presses.
    pub multi_hold_delay: Duration,
    pub multi_repeat_interval: Duration,
    pub double_tap_window: Duration,
    pub sensitivity: f64,
}

impl Default for ButtonPlan {
    fn default() -> Self {
        Self {
            momentary_start: false,
            momentary_end: false,
            double_tap: false,
            multi_double_tap: false,
            hold_repeats: false,
            multi_hold_repeats: false,
            hold_delay: DEFAULT_HOLD_DELAY,
            repeat_interval: DEFAULT_REPEAT_INTERVAL,
            multi_hold_delay: DEFAULT_HOLD_DELAY,
            multi_repeat_interval: DEFAULT_REPEAT_INTERVAL,
            double_tap_window: DEFAULT_DOUBLE_TAP_WINDOW,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

impl ButtonPlan {
    /// Plan from fixed timing overrides; templated ones fall back to the defaults.
    pub fn from_actions(actions: &ActionSet, sensitivity: Option<f64>) -> Self {
        Self::from_actions_with(actions, sensitivity, Millis::fixed)
    }

    /// Plan resolving every timing override through `millis`.
    ///
    /// `multi_hold` overrides apply to multi-touch presses; a field it leaves
    /// unset falls back to the `hold` override.
    pub fn from_actions_with(
        actions: &ActionSet,
        sensitivity: Option<f64>,
        millis: impl Fn(&Millis) -> Option<u64>,
    ) -> Self {
        fn configured(action: &Option<ActionDescriptor>) -> bool {
            action.as_ref().is_some_and(|a| !a.is_none())
        }

        let hold = actions.hold.as_ref();
        let multi_hold = actions.multi_hold.as_ref();
        let double_tap = actions.double_tap.as_ref();
        let resolve = |setting: Option<&Millis>| setting.and_then(|m| millis(m));

        let hold_ms = resolve(hold.and_then(|a| a.hold_time.as_ref()));
        let repeat_ms = resolve(hold.and_then(|a| a.repeat_delay.as_ref())).filter(|ms| *ms > 0);
        let multi_hold_ms = resolve(multi_hold.and_then(|a| a.hold_time.as_ref())).or(hold_ms);
        let multi_repeat_ms = resolve(multi_hold.and_then(|a| a.repeat_delay.as_ref()))
            .filter(|ms| *ms > 0)
            .or(repeat_ms);
        let window_ms = resolve(double_tap.and_then(|a| a.double_tap_window.as_ref()));
        let duration =
            |ms: Option<u64>, default: Duration| ms.map(Duration::from_millis).unwrap_or(default);

        Self {
            momentary_start: configured(&actions.momentary_start),
            momentary_end: configured(&actions.momentary_end),
            double_tap: configured(&actions.double_tap),
            multi_double_tap: configured(&actions.multi_double_tap)
                || configured(&actions.double_tap),
            hold_repeats: hold.is_some_and(ActionDescriptor::is_repeat),
            multi_hold_repeats: multi_hold.or(hold).is_some_and(ActionDescriptor::is_repeat),
            hold_delay: duration(hold_ms, DEFAULT_HOLD_DELAY),
            repeat_interval: duration(repeat_ms, DEFAULT_REPEAT_INTERVAL),
            multi_hold_delay: duration(multi_hold_ms, DEFAULT_HOLD_DELAY),
            multi_repeat_interval: duration(multi_repeat_ms, DEFAULT_REPEAT_INTERVAL),
            double_tap_window: duration(window_ms, DEFAULT_DOUBLE_TAP_WINDOW),
            sensitivity: sensitivity.unwrap_or(DEFAULT_SENSITIVITY),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ButtonPhase {
    Idle,
    /// Down, waiting for hold-detect or release.
    Pressed,
    /// Down with a momentary action configured.
    Momentary,
    /// Movement exceeded the sensitivity threshold; nothing fires until the next press.
    Swiping,
    /// Hold action fired; release is suppressed.
    Held,
    /// Hold policy is `repeat`; taps re-fire on every tick until release.
    Repeating,
    /// First release seen, waiting for a second tap inside the window.
    AwaitingSecondTap,
    /// Second press inside the window.
    SecondPress,
}

/// Gesture state of one button.
#[derive(Debug)]
pub struct ButtonGesture {
    plan: ButtonPlan,
    phase: ButtonPhase,
    timers: TimerSlots,
    press_start: Option<Instant>,
    press_end: Option<Instant>,
    origin: Option<Point>,
    multi: bool,
    clicks: u32,
}

impl ButtonGesture {
    pub fn new(plan: ButtonPlan) -> Self {
        Self {
            plan,
            phase: ButtonPhase::Idle,
            timers: TimerSlots::default(),
            press_start: None,
            press_end: None,
            origin: None,
            multi: false,
            clicks: 0,
        }
    }

    pub fn plan(&self) -> &ButtonPlan {
        &self.plan
    }

    pub fn phase(&self) -> ButtonPhase {
        self.phase
    }

    /// Seconds between momentary press start and end, 0 until both are known.
    pub fn hold_secs(&self) -> f64 {
        match (self.press_start, self.press_end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).as_secs_f64(),
            _ => 0.0,
        }
    }

    fn slot(&self, base: ActionSlot) -> ActionSlot {
        if self.multi { base.multi() } else { base }
    }

    fn double_tap_enabled(&self) -> bool {
        if self.multi {
            self.plan.multi_double_tap
        } else {
            self.plan.double_tap
        }
    }

    fn hold_repeats(&self) -> bool {
        if self.multi {
            self.plan.multi_hold_repeats
        } else {
            self.plan.hold_repeats
        }
    }

    fn hold_delay(&self) -> Duration {
        if self.multi {
            self.plan.multi_hold_delay
        } else {
            self.plan.hold_delay
        }
    }

    fn repeat_interval(&self) -> Duration {
        if self.multi {
            self.plan.multi_repeat_interval
        } else {
            self.plan.repeat_interval
        }
    }

    fn fire(&self, base: ActionSlot, haptic: Haptic, out: &mut Vec<Intent>) {
        let slot = self.slot(base);
        debug!(target: "remotekit::gesture", slot = slot.as_str(), "recognized");
        out.push(Intent::Fire(Firing {
            trigger: Trigger::Slot(slot),
            haptic,
            hold_secs: self.hold_secs(),
        }));
    }

    /// Clear every timer and flag and return to idle.
    fn end(&mut self, out: &mut Vec<Intent>) {
        self.timers.cancel_all(out);
        self.phase = ButtonPhase::Idle;
        self.press_start = None;
        self.press_end = None;
        self.origin = None;
        self.multi = false;
        self.clicks = 0;
    }

    fn press(&mut self, point: Point, touches: u8, at: Instant, out: &mut Vec<Intent>) {
        match self.phase {
            ButtonPhase::AwaitingSecondTap => {
                // Same gesture sequence: the tap window stays armed, no hold detection.
                self.phase = ButtonPhase::SecondPress;
                self.origin = Some(point);
                return;
            }
            ButtonPhase::Idle => {}
            stale => {
                trace!(target: "remotekit::gesture", phase = ?stale, "press while busy; resetting");
                self.end(out);
            }
        }

        self.origin = Some(point);
        self.multi = touches > 1;

        if self.plan.momentary_start {
            self.press_start = Some(at);
            self.phase = ButtonPhase::Momentary;
            self.fire(ActionSlot::MomentaryStart, Haptic::Light, out);
        } else if self.plan.momentary_end {
            self.press_start = Some(at);
            self.phase = ButtonPhase::Momentary;
            out.push(Intent::Haptic(Haptic::Light));
        } else {
            self.phase = ButtonPhase::Pressed;
            self.timers
                .arm(TimerKind::HoldDetect, self.hold_delay(), out);
        }
    }

    fn moved(&mut self, point: Point, out: &mut Vec<Intent>) {
        let tracking = matches!(
            self.phase,
            ButtonPhase::Pressed
                | ButtonPhase::Momentary
                | ButtonPhase::Held
                | ButtonPhase::Repeating
                | ButtonPhase::SecondPress
        );
        let Some(origin) = self.origin.filter(|_| tracking) else {
            return;
        };
        let dx = origin.x - point.x;
        let dy = origin.y - point.y;
        if (dx.abs() - dy.abs()).abs() > self.plan.sensitivity {
            debug!(target: "remotekit::gesture", dx, dy, "swipe detected; gesture suppressed");
            self.end(out);
            self.phase = ButtonPhase::Swiping;
        }
    }

    fn release(&mut self, at: Instant, out: &mut Vec<Intent>) {
        match self.phase {
            ButtonPhase::Momentary => {
                if self.plan.momentary_end {
                    self.press_end = Some(at);
                    self.fire(ActionSlot::MomentaryEnd, Haptic::Selection, out);
                }
                self.end(out);
            }
            ButtonPhase::Pressed => {
                self.timers.cancel(TimerKind::HoldDetect, out);
                self.click(out);
            }
            ButtonPhase::SecondPress => self.click(out),
            ButtonPhase::Held | ButtonPhase::Repeating | ButtonPhase::Swiping => self.end(out),
            ButtonPhase::Idle | ButtonPhase::AwaitingSecondTap => {
                trace!(target: "remotekit::gesture", phase = ?self.phase, "release ignored");
            }
        }
    }

    fn click(&mut self, out: &mut Vec<Intent>) {
        self.clicks += 1;
        if !self.double_tap_enabled() {
            self.fire(ActionSlot::Tap, Haptic::Light, out);
            self.end(out);
        } else if self.clicks > 1 {
            self.fire(ActionSlot::DoubleTap, Haptic::Success, out);
            self.end(out);
        } else {
            self.phase = ButtonPhase::AwaitingSecondTap;
            self.origin = None;
            self.timers
                .arm(TimerKind::TapWindow, self.plan.double_tap_window, out);
        }
    }
}

impl Recognizer for ButtonGesture {
    fn name(&self) -> &'static str {
        "button"
    }

    fn replan(&mut self, plan: ButtonPlan) {
        if self.phase == ButtonPhase::Idle {
            self.plan = plan;
        } else {
            trace!(target: "remotekit::gesture", phase = ?self.phase, "new plan ignored mid-gesture");
        }
    }

    fn pointer(&mut self, event: PointerEvent, at: Instant) -> Vec<Intent> {
        let mut out = Vec::new();
        match event {
            PointerEvent::Down { x, y, touches } => self.press(Point::new(x, y), touches, at, &mut out),
            PointerEvent::Move { x, y } => self.moved(Point::new(x, y), &mut out),
            PointerEvent::Up => self.release(at, &mut out),
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
            (TimerKind::HoldDetect, ButtonPhase::Pressed) => {
                if self.hold_repeats() {
                    self.phase = ButtonPhase::Repeating;
                    self.timers
                        .arm(TimerKind::Repeat, self.repeat_interval(), &mut out);
                } else {
                    self.phase = ButtonPhase::Held;
                    self.fire(ActionSlot::Hold, Haptic::Medium, &mut out);
                }
            }
            (TimerKind::Repeat, ButtonPhase::Repeating) => {
                self.fire(ActionSlot::Tap, Haptic::Selection, &mut out);
                self.timers
                    .arm(TimerKind::Repeat, self.repeat_interval(), &mut out);
            }
            (TimerKind::TapWindow, ButtonPhase::AwaitingSecondTap | ButtonPhase::SecondPress) => {
                self.fire(ActionSlot::Tap, Haptic::Light, &mut out);
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
        self.phase == ButtonPhase::Idle && self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::sim::Sim;
    use crate::config::ActionSlot::*;

    fn plan() -> ButtonPlan {
        ButtonPlan::default()
    }

    fn with_double_tap() -> ButtonPlan {
        ButtonPlan {
            double_tap: true,
            multi_double_tap: true,
            ..plan()
        }
    }

    fn sim(plan: ButtonPlan) -> Sim<ButtonGesture> {
        Sim::new(ButtonGesture::new(plan))
    }

    #[test]
    fn short_press_fires_one_tap() {
        let mut s = sim(plan());
        s.down(10.0, 10.0);
        s.advance(120);
        s.up();
        s.advance(2_000);
        assert_eq!(s.slots(), vec![Tap]);
        assert_eq!(s.haptics, vec![Haptic::Light]);
        assert!(s.machine.is_idle());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn jitter_below_threshold_still_taps() {
        let mut s = sim(plan());
        s.down(10.0, 10.0);
        s.move_to(15.0, 12.0);
        s.move_to(4.0, 3.0);
        s.up();
        assert_eq!(s.slots(), vec![Tap]);
    }

    #[test]
    fn two_quick_taps_fire_one_double_tap() {
        let mut s = sim(with_double_tap());
        s.down(0.0, 0.0);
        s.up();
        s.advance(80);
        s.down(0.0, 0.0);
        s.advance(40);
        s.up();
        s.advance(1_000);
        assert_eq!(s.slots(), vec![DoubleTap]);
        assert_eq!(s.haptics, vec![Haptic::Success]);
        assert!(s.machine.is_idle());
    }

    #[test]
    fn taps_spaced_beyond_window_fire_two_taps() {
        let mut s = sim(with_double_tap());
        s.down(0.0, 0.0);
        s.up();
        s.advance(250);
        s.down(0.0, 0.0);
        s.up();
        s.advance(250);
        assert_eq!(s.slots(), vec![Tap, Tap]);
    }

    #[test]
    fn single_tap_waits_for_window_when_double_tap_configured() {
        let mut s = sim(with_double_tap());
        s.down(0.0, 0.0);
        s.up();
        s.advance(199);
        assert!(s.fired.is_empty());
        s.advance(1);
        assert_eq!(s.slots(), vec![Tap]);
    }

    #[test]
    fn custom_double_tap_window() {
        let mut s = sim(ButtonPlan {
            double_tap_window: Duration::from_millis(400),
            ..with_double_tap()
        });
        s.down(0.0, 0.0);
        s.up();
        s.advance(300);
        s.down(0.0, 0.0);
        s.up();
        assert_eq!(s.slots(), vec![DoubleTap]);
    }

    #[test]
    fn hold_fires_once_and_release_is_suppressed() {
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        s.advance(499);
        assert!(s.fired.is_empty());
        s.advance(1);
        assert_eq!(s.slots(), vec![Hold]);
        assert_eq!(s.machine.phase(), ButtonPhase::Held);
        s.advance(1_000);
        s.up();
        s.advance(1_000);
        assert_eq!(s.slots(), vec![Hold]);
        assert_eq!(s.haptics, vec![Haptic::Medium]);
        assert!(s.machine.is_idle());
    }

    #[test]
    fn custom_hold_delay() {
        let mut s = sim(ButtonPlan {
            hold_delay: Duration::from_millis(800),
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(600);
        s.up();
        assert_eq!(s.slots(), vec![Tap]);
    }

    #[test]
    fn repeat_fires_floor_of_held_time_over_interval() {
        let mut s = sim(ButtonPlan {
            hold_repeats: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(500);
        assert!(s.fired.is_empty());
        assert_eq!(s.machine.phase(), ButtonPhase::Repeating);
        s.advance(350);
        assert_eq!(s.count(Tap), 3);
        s.up();
        s.advance(1_000);
        assert_eq!(s.count(Tap), 3);
        assert_eq!(s.count(Hold), 0);
        assert!(s.haptics.iter().all(|h| *h == Haptic::Selection));
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn repeat_honours_custom_interval() {
        let mut s = sim(ButtonPlan {
            hold_repeats: true,
            repeat_interval: Duration::from_millis(40),
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(500 + 200);
        s.up();
        assert_eq!(s.count(Tap), 5);
    }

    #[test]
    fn swipe_suppresses_everything() {
        let mut s = sim(with_double_tap());
        s.down(100.0, 100.0);
        s.move_to(70.0, 98.0);
        assert_eq!(s.machine.phase(), ButtonPhase::Swiping);
        assert_eq!(s.pending(), 0);
        s.up();
        s.advance(2_000);
        assert!(s.fired.is_empty());
        assert!(s.machine.is_idle());
    }

    #[test]
    fn diagonal_movement_is_not_a_swipe() {
        // |dx| and |dy| grow together, so their difference stays small.
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        s.move_to(30.0, 30.0);
        s.up();
        assert_eq!(s.slots(), vec![Tap]);
    }

    #[test]
    fn swipe_stops_a_running_repeat() {
        let mut s = sim(ButtonPlan {
            hold_repeats: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(720);
        assert_eq!(s.count(Tap), 2);
        s.move_to(0.0, 40.0);
        s.advance(1_000);
        s.up();
        assert_eq!(s.count(Tap), 2);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn swipe_during_second_press_drops_pending_tap() {
        let mut s = sim(with_double_tap());
        s.down(0.0, 0.0);
        s.up();
        s.advance(50);
        s.down(0.0, 0.0);
        s.move_to(50.0, 0.0);
        s.up();
        s.advance(500);
        assert!(s.fired.is_empty());
    }

    #[test]
    fn leave_cancels_pending_hold() {
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        s.advance(200);
        s.send(PointerEvent::Leave);
        assert!(s.machine.is_idle());
        s.advance(2_000);
        s.up();
        assert!(s.fired.is_empty());
    }

    #[test]
    fn stale_timer_after_cancel_is_ignored() {
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        let stale = TimerId {
            kind: TimerKind::HoldDetect,
            generation: 1,
        };
        s.up();
        assert_eq!(s.slots(), vec![Tap]);
        s.deliver(stale);
        assert_eq!(s.slots(), vec![Tap]);
        assert!(s.machine.is_idle());
    }

    #[test]
    fn stale_hold_from_previous_press_does_not_fire_in_new_press() {
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        s.up();
        s.down(0.0, 0.0);
        // Generation 1 belonged to the first press.
        s.deliver(TimerId {
            kind: TimerKind::HoldDetect,
            generation: 1,
        });
        assert_eq!(s.machine.phase(), ButtonPhase::Pressed);
        assert_eq!(s.slots(), vec![Tap]);
    }

    #[test]
    fn momentary_pair_reports_hold_seconds() {
        let mut s = sim(ButtonPlan {
            momentary_start: true,
            momentary_end: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        assert_eq!(s.slots(), vec![MomentaryStart]);
        s.move_to(3.0, 0.0);
        s.advance(1_250);
        s.up();
        assert_eq!(s.slots(), vec![MomentaryStart, MomentaryEnd]);
        let end = &s.fired[1];
        assert!((end.hold_secs - 1.25).abs() < 1e-6);
        assert_eq!(s.haptics, vec![Haptic::Light, Haptic::Selection]);
        assert!(s.machine.is_idle());
    }

    #[test]
    fn swipe_during_momentary_press_drops_the_end_action() {
        let mut s = sim(ButtonPlan {
            momentary_start: true,
            momentary_end: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        s.move_to(100.0, 0.0);
        assert_eq!(s.machine.phase(), ButtonPhase::Swiping);
        s.advance(300);
        s.up();
        s.advance(1_000);
        assert_eq!(s.slots(), vec![MomentaryStart]);
        assert!(s.machine.is_idle());
    }

    #[test]
    fn momentary_bypasses_tap_and_hold() {
        let mut s = sim(ButtonPlan {
            momentary_start: true,
            double_tap: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(900);
        s.up();
        s.advance(900);
        assert_eq!(s.slots(), vec![MomentaryStart]);
    }

    #[test]
    fn momentary_end_only_still_tracks_press_start() {
        let mut s = sim(ButtonPlan {
            momentary_end: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        assert!(s.fired.is_empty());
        assert_eq!(s.haptics, vec![Haptic::Light]);
        s.advance(300);
        s.up();
        assert_eq!(s.slots(), vec![MomentaryEnd]);
        assert!((s.fired[0].hold_secs - 0.3).abs() < 1e-6);
    }

    #[test]
    fn multi_touch_routes_to_multi_slots() {
        let mut s = sim(plan());
        s.send(PointerEvent::Down {
            x: 0.0,
            y: 0.0,
            touches: 2,
        });
        s.up();
        s.send(PointerEvent::Down {
            x: 0.0,
            y: 0.0,
            touches: 2,
        });
        s.advance(500);
        s.up();
        assert_eq!(s.slots(), vec![MultiTap, MultiHold]);
    }

    #[test]
    fn press_while_busy_restarts_cleanly() {
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        s.advance(300);
        s.down(0.0, 0.0);
        assert_eq!(s.pending(), 1);
        s.advance(300);
        assert!(s.fired.is_empty());
        s.advance(200);
        assert_eq!(s.slots(), vec![Hold]);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut s = sim(ButtonPlan {
            hold_repeats: true,
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(600);
        s.reset();
        s.reset();
        assert!(s.machine.is_idle());
        assert_eq!(s.pending(), 0);
        s.advance(1_000);
        assert_eq!(s.count(Tap), 1);
    }

    #[test]
    fn moves_without_press_are_ignored() {
        let mut s = sim(plan());
        s.move_to(500.0, 0.0);
        s.down(0.0, 0.0);
        s.up();
        assert_eq!(s.slots(), vec![Tap]);
    }

    #[test]
    fn plan_from_actions_reads_overrides() {
        let mut actions = ActionSet::default();
        actions.tap = Some(ActionDescriptor::key("DPAD_UP"));
        actions.hold = Some(ActionDescriptor {
            hold_time: Some(750.into()),
            repeat_delay: Some(30.into()),
            ..ActionDescriptor::new(crate::config::ActionKind::Repeat)
        });
        actions.double_tap = Some(ActionDescriptor {
            double_tap_window: Some(300.into()),
            ..ActionDescriptor::key("BACK")
        });
        actions.momentary_end = Some(ActionDescriptor::none());

        let plan = ButtonPlan::from_actions(&actions, Some(12.0));
        assert!(plan.hold_repeats);
        assert!(plan.multi_hold_repeats);
        assert!(plan.double_tap);
        assert!(!plan.momentary_end);
        assert_eq!(plan.hold_delay, Duration::from_millis(750));
        assert_eq!(plan.repeat_interval, Duration::from_millis(30));
        assert_eq!(plan.multi_hold_delay, Duration::from_millis(750));
        assert_eq!(plan.multi_repeat_interval, Duration::from_millis(30));
        assert_eq!(plan.double_tap_window, Duration::from_millis(300));
        assert_eq!(plan.sensitivity, 12.0);
    }

    #[test]
    fn multi_hold_overrides_its_own_timing() {
        let mut actions = ActionSet::default();
        actions.hold = Some(ActionDescriptor {
            hold_time: Some(900.into()),
            ..ActionDescriptor::key("HOME")
        });
        actions.multi_hold = Some(ActionDescriptor {
            repeat_delay: Some(40.into()),
            ..ActionDescriptor::new(crate::config::ActionKind::Repeat)
        });

        let plan = ButtonPlan::from_actions(&actions, None);
        assert!(!plan.hold_repeats);
        assert!(plan.multi_hold_repeats);
        assert_eq!(plan.hold_delay, Duration::from_millis(900));
        assert_eq!(plan.multi_hold_delay, Duration::from_millis(900));
        assert_eq!(plan.repeat_interval, DEFAULT_REPEAT_INTERVAL);
        assert_eq!(plan.multi_repeat_interval, Duration::from_millis(40));

        let mut s = sim(plan);
        s.send(PointerEvent::Down {
            x: 0.0,
            y: 0.0,
            touches: 2,
        });
        s.advance(899);
        assert!(s.fired.is_empty());
        s.advance(1 + 40 * 3);
        s.up();
        assert_eq!(s.slots(), vec![MultiTap, MultiTap, MultiTap]);
    }

    #[test]
    fn templated_timing_resolves_through_the_callback() {
        let mut actions = ActionSet::default();
        actions.hold = Some(ActionDescriptor {
            hold_time: Some(Millis::Templated("{{ config.delay }}".into())),
            repeat_delay: Some(Millis::Templated("{{ nothing }}".into())),
            ..ActionDescriptor::new(crate::config::ActionKind::Repeat)
        });

        let fixed = ButtonPlan::from_actions(&actions, None);
        assert_eq!(fixed.hold_delay, DEFAULT_HOLD_DELAY);

        let rendered = ButtonPlan::from_actions_with(&actions, None, |m| match m {
            Millis::Templated(t) if t.contains("delay") => Some(650),
            _ => None,
        });
        assert_eq!(rendered.hold_delay, Duration::from_millis(650));
        assert_eq!(rendered.repeat_interval, DEFAULT_REPEAT_INTERVAL);
    }

    #[test]
    fn replan_only_applies_while_idle() {
        let mut s = sim(plan());
        s.down(0.0, 0.0);
        s.machine.replan(ButtonPlan {
            hold_delay: Duration::from_millis(100),
            ..plan()
        });
        assert_eq!(s.machine.plan().hold_delay, DEFAULT_HOLD_DELAY);
        s.up();
        s.machine.replan(ButtonPlan {
            hold_delay: Duration::from_millis(100),
            ..plan()
        });
        s.down(0.0, 0.0);
        s.advance(100);
        assert_eq!(s.slots(), vec![Tap, Hold]);
    }
}
