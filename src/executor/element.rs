//! One interactive element: a recognizer, its resolved action set, an optional value
//! tracker, and the glue that turns recognizer intents into timers, haptics and
//! dispatches.
//!
//! Whatever happens during a dispatch, the recognizer ends up idle with every timer
//! cancelled before an error is returned.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use super::dispatch::{Dispatch, Dispatcher, LONG_PRESS_SECS};
use super::error::DispatchError;
use super::resolver::data_entity_id;
use crate::config::{ActionSet, ElementConfig, ElementKind, RemoteConfig};
use crate::gesture::{
    ButtonGesture, ButtonPlan, Firing, Intent, PointerEvent, Recognizer, TimerId, TouchpadGesture,
    TouchpadPlan, Trigger,
};
use crate::tracker::{Reading, ValueTracker};

/// Timer backend an element arms and cancels through.
pub trait Scheduler {
    fn arm(&mut self, element: &str, timer: TimerId, after: Duration);
    fn cancel(&mut self, element: &str, timer: TimerId);
}

pub struct RemoteElement {
    id: String,
    kind: ElementKind,
    actions: ActionSet,
    recognizer: Box<dyn Recognizer>,
    /// Button sensitivity, kept for re-planning.
    sensitivity: Option<f64>,
    /// Some timing override is a template, rendered at every press.
    templated_timing: bool,
    haptics: bool,
    tracker: Option<ValueTracker>,
    value: Value,
    dispatcher: Arc<Dispatcher>,
}

impl RemoteElement {
    pub fn new(
        id: impl Into<String>,
        cfg: &ElementConfig,
        remote: &RemoteConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let id = id.into();
        let mut actions = cfg.actions.clone();
        if let (ElementKind::Button, Some(name), None) = (cfg.kind, &cfg.key, &actions.tap) {
            let named = dispatcher.keys().named_button(name);
            actions.tap = named.tap;
            if actions.hold.is_none() {
                actions.hold = named.hold;
            }
        }

        let recognizer: Box<dyn Recognizer> = match cfg.kind {
            ElementKind::Button => Box::new(ButtonGesture::new(ButtonPlan::from_actions(
                &actions,
                cfg.sensitivity,
            ))),
            ElementKind::Touchpad => {
                Box::new(TouchpadGesture::new(TouchpadPlan::from(&remote.touchpad)))
            }
        };

        let templated_timing = cfg.kind == ElementKind::Button
            && [&actions.hold, &actions.multi_hold, &actions.double_tap]
                .into_iter()
                .flatten()
                .any(|a| a.has_templated_timing());

        let mut element = Self {
            id,
            kind: cfg.kind,
            actions,
            recognizer,
            sensitivity: cfg.sensitivity,
            templated_timing,
            haptics: cfg.haptics.unwrap_or(remote.haptics),
            tracker: None,
            value: Value::Null,
            dispatcher,
        };

        let entity = cfg
            .entity_id
            .as_ref()
            .map(|e| Value::String(e.clone()))
            .or_else(|| element.actions.tap.as_ref().and_then(data_entity_id).cloned());
        if let Some(entity) = entity {
            let rendered = element
                .dispatcher
                .host()
                .templates
                .render(&entity, &element.context(0.0, None));
            match rendered.as_str().filter(|e| !e.is_empty()) {
                Some(entity_id) => {
                    element.tracker = Some(ValueTracker::new(
                        entity_id,
                        cfg.value_attribute.as_deref(),
                        cfg.precision,
                    ))
                }
                None => {
                    debug!(target: "remotekit::tracker", element = %element.id, "entity id rendered empty; value not tracked")
                }
            }
        }
        element
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn tracker(&self) -> Option<&ValueTracker> {
        self.tracker.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.recognizer.is_idle()
    }

    pub fn pointer(
        &mut self,
        event: PointerEvent,
        at: Instant,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), DispatchError> {
        trace!(target: "remotekit::gesture", element = %self.id, event = event.as_str(), "pointer");
        if self.templated_timing
            && matches!(event, PointerEvent::Down { .. })
            && self.recognizer.is_idle()
        {
            let plan = self.rendered_plan();
            self.recognizer.replan(plan);
        }
        let intents = self.recognizer.pointer(event, at);
        self.apply(intents, scheduler)
    }

    pub fn timer(
        &mut self,
        timer: TimerId,
        at: Instant,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), DispatchError> {
        let intents = self.recognizer.timer_fired(timer, at);
        self.apply(intents, scheduler)
    }

    /// Return to idle, cancelling every live timer.
    pub fn reset(&mut self, scheduler: &mut dyn Scheduler) {
        for intent in self.recognizer.reset() {
            if let Intent::Cancel { timer } = intent {
                scheduler.cancel(&self.id, timer);
            }
        }
    }

    /// Re-read the tracked value. Returns the reading, `None` when nothing is tracked.
    pub fn refresh_value(&mut self, now: DateTime<Utc>) -> Option<Reading> {
        let tracker = self.tracker.as_ref()?;
        let reading = tracker.read(self.dispatcher.host().states.as_ref(), now);
        if reading.value != self.value {
            debug!(
                target: "remotekit::tracker",
                element = %self.id, entity = %tracker.entity_id(), value = %reading.value,
                "value changed"
            );
            self.value = reading.value.clone();
        }
        Some(reading)
    }

    fn apply(
        &mut self,
        intents: Vec<Intent>,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), DispatchError> {
        let mut intents = intents.into_iter();
        while let Some(intent) = intents.next() {
            match intent {
                Intent::Arm { timer, after } => scheduler.arm(&self.id, timer, after),
                Intent::Cancel { timer } => scheduler.cancel(&self.id, timer),
                Intent::Haptic(haptic) => {
                    if self.haptics {
                        self.dispatcher.host().haptics.feedback(haptic);
                    }
                }
                Intent::Fire(firing) => {
                    if let Err(err) = self.fire(firing) {
                        for rest in intents {
                            if let Intent::Cancel { timer } = rest {
                                scheduler.cancel(&self.id, timer);
                            }
                        }
                        self.reset(scheduler);
                        warn!(
                            target: "remotekit::dispatch",
                            element = %self.id, error = %err,
                            "Dispatch failed; gesture reset"
                        );
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    fn fire(&self, firing: Firing) -> Result<(), DispatchError> {
        if self.haptics {
            self.dispatcher.host().haptics.feedback(firing.haptic);
        }

        let named;
        let (action, hold_secs) = match &firing.trigger {
            Trigger::Slot(slot) => {
                let Some((found, action)) = self.actions.resolve(*slot) else {
                    trace!(target: "remotekit::dispatch", element = %self.id, slot = slot.as_str(), "no action configured");
                    return Ok(());
                };
                let reused_for_hold = slot.is_hold() && !found.is_hold();
                debug!(
                    target: "remotekit::dispatch",
                    element = %self.id, slot = slot.as_str(), resolved = found.as_str(),
                    "gesture fired"
                );
                (action, reused_for_hold.then_some(LONG_PRESS_SECS))
            }
            Trigger::Named { name, long_press } => {
                named = self.dispatcher.keys().resolve(name);
                debug!(target: "remotekit::dispatch", element = %self.id, %name, long_press, "touchpad fired");
                (&named, long_press.then_some(LONG_PRESS_SECS))
            }
        };

        let context = self.context(firing.hold_secs, Some(&self.actions));
        self.dispatcher.dispatch(Dispatch {
            action,
            hold_secs,
            context: &context,
            haptics: self.haptics,
        })
    }

    /// Button plan with every templated timing rendered against the current context.
    fn rendered_plan(&self) -> ButtonPlan {
        let context = self.context(0.0, Some(&self.actions));
        let templates = &self.dispatcher.host().templates;
        let plan = ButtonPlan::from_actions_with(&self.actions, self.sensitivity, |setting| {
            setting.resolve(|template| templates.render(&Value::String(template.to_string()), &context))
        });
        trace!(
            target: "remotekit::gesture",
            element = %self.id, hold = ?plan.hold_delay, repeat = ?plan.repeat_interval,
            window = ?plan.double_tap_window,
            "timing rendered"
        );
        plan
    }

    /// Template context: `VALUE`, `HOLD_SECS` and `config` (actions plus `entity`).
    fn context(&self, hold_secs: f64, actions: Option<&ActionSet>) -> Map<String, Value> {
        let mut config = actions
            .and_then(|a| serde_json::to_value(a).ok())
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        config.insert(
            "entity".into(),
            self.tracker
                .as_ref()
                .map(|t| json!(t.entity_id()))
                .unwrap_or(Value::Null),
        );

        let mut ctx = Map::new();
        ctx.insert("VALUE".into(), self.value.clone());
        ctx.insert("HOLD_SECS".into(), Value::from(hold_secs));
        ctx.insert("config".into(), Value::Object(config));
        ctx
    }
}

impl std::fmt::Debug for RemoteElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteElement")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("recognizer", &self.recognizer.name())
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
