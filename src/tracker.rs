//! Value Tracker.
//!
//! Derives the displayed value of an element from entity state:
//! - `state` (default) or any attribute, with one optional trailing `[n]` index
//! - `brightness` as a 0-100 percentage
//! - `media_position` extrapolated while the player is `playing`, clamped to `media_duration`
//! - `elapsed` of a `timer.*` entity, from `finishes_at` while active or `remaining` while paused
//!
//! Extrapolated readings are flagged `animated`; the runtime re-reads them on a fixed
//! interval while that holds.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, trace};

use crate::host::{EntityState, StateProvider};

/// Re-read interval for animated values.
pub const VALUE_TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// `Null` when the entity or attribute is missing.
    pub value: Value,
    pub animated: bool,
}

impl Reading {
    fn fixed(value: Value) -> Self {
        Self {
            value,
            animated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueTracker {
    entity_id: String,
    attribute: String,
    index: Option<usize>,
    precision: Option<u32>,
}

impl ValueTracker {
    pub fn new(entity_id: impl Into<String>, attribute: Option<&str>, precision: Option<u32>) -> Self {
        let raw = attribute.unwrap_or("state").trim().to_lowercase();
        let (attribute, index) = split_index(&raw);
        Self {
            entity_id: entity_id.into(),
            attribute: attribute.to_string(),
            index,
            precision,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn read(&self, states: &dyn StateProvider, now: DateTime<Utc>) -> Reading {
        let Some(entity) = states.get(&self.entity_id) else {
            trace!(target: "remotekit::tracker", entity = %self.entity_id, "entity unavailable");
            return Reading::fixed(Value::Null);
        };
        let mut reading = self.derive(&entity, now);
        if self.precision == Some(0) {
            if let Some(n) = reading.value.as_f64() {
                reading.value = number(n.trunc());
            }
        }
        reading
    }

    fn derive(&self, entity: &EntityState, now: DateTime<Utc>) -> Reading {
        if self.attribute == "state" {
            return Reading::fixed(Value::String(entity.state.clone()));
        }

        let mut value = entity.attributes.get(&self.attribute).cloned().unwrap_or(Value::Null);
        if let (Some(index), Value::Array(items)) = (self.index, &value) {
            value = items.get(index).cloned().unwrap_or(Value::Null);
        }

        match self.attribute.as_str() {
            "elapsed" if self.entity_id.starts_with("timer.") => timer_elapsed(entity, now),
            _ if value.is_null() => Reading::fixed(Value::Null),
            "brightness" => Reading::fixed(
                as_f64(&value)
                    .map(|b| number((100.0 * b.trunc() / 255.0).round()))
                    .unwrap_or(Value::Null),
            ),
            "media_position" => media_position(entity, value, now),
            _ => Reading::fixed(value),
        }
    }
}

fn media_position(entity: &EntityState, value: Value, now: DateTime<Utc>) -> Reading {
    if entity.state != "playing" {
        return Reading::fixed(value);
    }
    let (Some(position), Some(updated)) = (
        as_f64(&value),
        timestamp(&entity.attributes, "media_position_updated_at"),
    ) else {
        debug!(target: "remotekit::tracker", "media_position without a usable timestamp");
        return Reading::fixed(value);
    };

    let since = (now - updated).num_milliseconds() as f64 / 1000.0;
    let mut current = (position.floor() + since).floor();
    if let Some(duration) = entity.attributes.get("media_duration").and_then(as_f64) {
        current = current.min(duration.floor());
    }
    Reading {
        value: number(current),
        animated: true,
    }
}

fn timer_elapsed(entity: &EntityState, now: DateTime<Utc>) -> Reading {
    if entity.state == "idle" {
        return Reading::fixed(number(0.0));
    }
    let Some(duration) = entity.attributes.get("duration").and_then(hms) else {
        return Reading::fixed(number(0.0));
    };

    if entity.state == "active" {
        let Some(finishes) = timestamp(&entity.attributes, "finishes_at") else {
            return Reading::fixed(number(0.0));
        };
        let remaining = (finishes - now).num_milliseconds() as f64 / 1000.0;
        return Reading {
            value: number((duration - remaining).floor().min(duration)),
            animated: true,
        };
    }

    match entity.attributes.get("remaining").and_then(hms) {
        Some(remaining) => Reading::fixed(number((duration - remaining).floor())),
        None => Reading::fixed(number(0.0)),
    }
}

/// `"volume[1]"` -> `("volume", Some(1))`.
fn split_index(attribute: &str) -> (&str, Option<usize>) {
    attribute
        .strip_suffix(']')
        .and_then(|rest| rest.rsplit_once('['))
        .and_then(|(name, idx)| idx.parse::<usize>().ok().map(|i| (name, Some(i))))
        .unwrap_or((attribute, None))
}

/// `"H:MM:SS"` -> seconds.
fn hms(value: &Value) -> Option<f64> {
    let mut parts = value.as_str()?.split(':').map(|p| p.trim().parse::<f64>());
    let (h, m, s) = (parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
    Some(h * 3600.0 + m * 60.0 + s)
}

fn timestamp(attributes: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = attributes.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whole numbers stay integers in JSON.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryStates;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:10Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn states(entity: &str, state: EntityState) -> MemoryStates {
        let s = MemoryStates::new();
        s.set(entity, state);
        s
    }

    #[test]
    fn missing_entity_is_null() {
        let t = ValueTracker::new("light.x", None, None);
        assert_eq!(t.read(&MemoryStates::new(), now()), Reading::fixed(Value::Null));
    }

    #[test]
    fn state_and_indexed_attribute() {
        let s = states(
            "sensor.x",
            EntityState::new("42").with_attribute("rgb_color", json!([10, 20, 30])),
        );
        assert_eq!(ValueTracker::new("sensor.x", None, None).read(&s, now()).value, json!("42"));
        let t = ValueTracker::new("sensor.x", Some("RGB_Color[1]"), None);
        assert_eq!(t.attribute(), "rgb_color");
        assert_eq!(t.read(&s, now()).value, json!(20));
        assert_eq!(
            ValueTracker::new("sensor.x", Some("rgb_color[9]"), None).read(&s, now()).value,
            Value::Null
        );
    }

    #[test]
    fn brightness_is_a_percentage() {
        let s = states("light.den", EntityState::new("on").with_attribute("brightness", json!(128)));
        let t = ValueTracker::new("light.den", Some("brightness"), None);
        assert_eq!(t.read(&s, now()).value, json!(50));
    }

    #[test]
    fn media_position_extrapolates_while_playing() {
        let playing = EntityState::new("playing")
            .with_attribute("media_position", json!(100.7))
            .with_attribute("media_position_updated_at", json!("2024-05-01T12:00:00Z"))
            .with_attribute("media_duration", json!(300));
        let t = ValueTracker::new("media_player.tv", Some("media_position"), None);
        let reading = t.read(&states("media_player.tv", playing.clone()), now());
        assert_eq!(reading, Reading { value: json!(110), animated: true });

        let late = now() + chrono::Duration::seconds(1_000);
        assert_eq!(t.read(&states("media_player.tv", playing.clone()), late).value, json!(300));

        let paused = EntityState {
            state: "paused".into(),
            ..playing
        };
        assert_eq!(
            t.read(&states("media_player.tv", paused), now()),
            Reading::fixed(json!(100.7))
        );
    }

    #[test]
    fn timer_elapsed_active_paused_idle() {
        let t = ValueTracker::new("timer.tea", Some("elapsed"), None);
        let active = EntityState::new("active")
            .with_attribute("duration", json!("0:05:00"))
            .with_attribute("finishes_at", json!("2024-05-01T12:04:00Z"));
        assert_eq!(
            t.read(&states("timer.tea", active), now()),
            Reading { value: json!(70), animated: true }
        );

        let paused = EntityState::new("paused")
            .with_attribute("duration", json!("0:05:00"))
            .with_attribute("remaining", json!("0:01:30"));
        assert_eq!(t.read(&states("timer.tea", paused), now()), Reading::fixed(json!(210)));

        let idle = EntityState::new("idle").with_attribute("duration", json!("0:05:00"));
        assert_eq!(t.read(&states("timer.tea", idle), now()).value, json!(0));

        let broken = EntityState::new("active").with_attribute("duration", json!("soon"));
        assert_eq!(t.read(&states("timer.tea", broken), now()).value, json!(0));
    }

    #[test]
    fn precision_zero_truncates() {
        let s = states("sensor.t", EntityState::new("on").with_attribute("temperature", json!(21.8)));
        let t = ValueTracker::new("sensor.t", Some("temperature"), Some(0));
        assert_eq!(t.read(&s, now()).value, json!(21));
        let t = ValueTracker::new("sensor.t", Some("temperature"), Some(2));
        assert_eq!(t.read(&s, now()).value, json!(21.8));
    }
}
