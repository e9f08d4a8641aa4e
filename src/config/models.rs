use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Root configuration for a remote surface.
///
/// Deserialized from a JSON file. It carries:
/// - the default command target (`remote_id`) and value-source target (`media_player_id`)
/// - named action tables (`custom_keys`, `custom_sources`) consulted before the built-ins
/// - the interactive `elements`, keyed by element id
/// - input `sources` used by the binary
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RemoteConfig {
    /// Entity id of the remote that receives key commands and source changes.
    #[serde(default)]
    pub remote_id: Option<String>,

    /// Entity id of the media player, used for service-call auto-fill.
    #[serde(default)]
    pub media_player_id: Option<String>,

    /// Entity id of the ADB bridge that receives text input and searches.
    #[serde(default)]
    pub adb_id: Option<String>,

    /// Fill in a missing service-call target from `remote_id` / `media_player_id`.
    #[serde(default)]
    pub autofill_entity_id: bool,

    /// Forward haptic feedback (default: true). Elements may override.
    #[serde(default = "default_true", alias = "enable_button_feedback")]
    pub haptics: bool,

    /// User-defined named actions. Highest precedence during name resolution.
    #[serde(default)]
    pub custom_keys: KeyTable,

    /// User-defined named sources. Consulted after `custom_keys`.
    #[serde(default)]
    pub custom_sources: KeyTable,

    /// Touchpad behaviour shared by all touchpad elements.
    #[serde(default)]
    pub touchpad: TouchpadConfig,

    /// Interactive elements keyed by id.
    #[serde(default)]
    pub elements: BTreeMap<String, ElementConfig>,

    /// Input sources (stdin, replay files).
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            remote_id: None,
            media_player_id: None,
            adb_id: None,
            autofill_entity_id: false,
            haptics: true,
            custom_keys: KeyTable::new(),
            custom_sources: KeyTable::new(),
            touchpad: TouchpadConfig::default(),
            elements: BTreeMap::new(),
            sources: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Named action table: action name -> entry.
pub type KeyTable = BTreeMap<String, KeyEntry>;

/// A named action as found in the key and source tables.
///
/// Untagged: `{ "key": "DPAD_UP" }`, `{ "source": "netflix://" }` or
/// `{ "service": "media_player.volume_up", "service_data": { .. } }`.
/// Extra fields such as `icon` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum KeyEntry {
    Key {
        key: String,
    },
    Source {
        source: String,
    },
    Service {
        service: String,
        #[serde(default)]
        service_data: Map<String, Value>,
    },
}

/// Element kind.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Button,
    Touchpad,
}

/// Configuration of one interactive element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ElementConfig {
    #[serde(default)]
    pub kind: ElementKind,

    /// Named action (e.g. `"up"`, `"netflix"`) used when no `tap_action` is set.
    #[serde(default)]
    pub key: Option<String>,

    /// Entity whose value is tracked. Falls back to `tap_action.data.entity_id`.
    #[serde(default)]
    pub entity_id: Option<String>,

    /// Attribute to track (`state` when omitted). Supports one trailing `[n]`.
    #[serde(default)]
    pub value_attribute: Option<String>,

    /// Numeric precision of the tracked value; `0` truncates.
    #[serde(default)]
    pub precision: Option<u32>,

    /// Per-element haptics override.
    #[serde(default)]
    pub haptics: Option<bool>,

    /// Swipe sensitivity threshold (default: 8).
    #[serde(default)]
    pub sensitivity: Option<f64>,

    #[serde(flatten)]
    pub actions: ActionSet,
}

/// Action slots of an element.
///
/// Immutable for the lifetime of an element; a reconfiguration replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionSet {
    #[serde(
        rename = "tap_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub tap: Option<ActionDescriptor>,

    #[serde(
        rename = "hold_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub hold: Option<ActionDescriptor>,

    #[serde(
        rename = "double_tap_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub double_tap: Option<ActionDescriptor>,

    #[serde(
        rename = "multi_tap_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub multi_tap: Option<ActionDescriptor>,

    #[serde(
        rename = "multi_hold_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub multi_hold: Option<ActionDescriptor>,

    #[serde(
        rename = "multi_double_tap_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub multi_double_tap: Option<ActionDescriptor>,

    #[serde(
        rename = "momentary_start_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub momentary_start: Option<ActionDescriptor>,

    #[serde(
        rename = "momentary_end_action",
        default,
        deserialize_with = "lenient_action",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<ActionDescriptor>")]
    pub momentary_end: Option<ActionDescriptor>,
}

/// A malformed slot must not take the whole configuration down with it.
fn lenient_action<'de, D>(deserializer: D) -> Result<Option<ActionDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.map(|value| {
        serde_json::from_value::<ActionDescriptor>(value).unwrap_or_else(|err| {
            warn!(
                target: "remotekit::config",
                error = %err,
                "Malformed action slot; treating it as 'none'"
            );
            ActionDescriptor::none()
        })
    }))
}

/// Named role within an [`ActionSet`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionSlot {
    Tap,
    Hold,
    DoubleTap,
    MultiTap,
    MultiHold,
    MultiDoubleTap,
    MomentaryStart,
    MomentaryEnd,
}

impl ActionSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tap => "tap_action",
            Self::Hold => "hold_action",
            Self::DoubleTap => "double_tap_action",
            Self::MultiTap => "multi_tap_action",
            Self::MultiHold => "multi_hold_action",
            Self::MultiDoubleTap => "multi_double_tap_action",
            Self::MomentaryStart => "momentary_start_action",
            Self::MomentaryEnd => "momentary_end_action",
        }
    }

    /// Whether this slot represents a long press.
    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold | Self::MultiHold)
    }

    /// The multi-touch counterpart of a single-touch slot.
    pub fn multi(self) -> Self {
        match self {
            Self::Tap => Self::MultiTap,
            Self::Hold => Self::MultiHold,
            Self::DoubleTap => Self::MultiDoubleTap,
            other => other,
        }
    }
}

/// A concrete instruction ready for dispatch.
///
/// The `action` tag selects the kind; the remaining fields are shared by every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionDescriptor {
    #[serde(flatten)]
    pub kind: ActionKind,

    /// Ask before dispatching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,

    /// Hold delay override in milliseconds (hold and multi-hold slots).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_time: Option<Millis>,

    /// Repeat interval override in milliseconds (hold slots with `repeat`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_delay: Option<Millis>,

    /// Double-tap window override in milliseconds (double-tap slot).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_tap_window: Option<Millis>,
}

impl ActionDescriptor {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            confirmation: None,
            hold_time: None,
            repeat_delay: None,
            double_tap_window: None,
        }
    }

    pub fn none() -> Self {
        Self::new(ActionKind::None)
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::new(ActionKind::Key { key: key.into() })
    }

    pub fn source(source: impl Into<String>) -> Self {
        Self::new(ActionKind::Source {
            source: source.into(),
        })
    }

    pub fn service(service: impl Into<String>, data: Map<String, Value>) -> Self {
        Self::new(ActionKind::CallService {
            service: service.into(),
            data,
            target: Map::new(),
        })
    }

    pub fn with_confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, ActionKind::None)
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self.kind, ActionKind::Repeat)
    }

    /// Any timing override that must be rendered before use.
    pub fn has_templated_timing(&self) -> bool {
        [&self.hold_time, &self.repeat_delay, &self.double_tap_window]
            .into_iter()
            .flatten()
            .any(Millis::is_templated)
    }
}

/// A millisecond setting: a number, or a template that renders to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Millis {
    Fixed(u64),
    Templated(String),
}

impl Millis {
    /// The value when no rendering is needed.
    pub fn fixed(&self) -> Option<u64> {
        match self {
            Self::Fixed(ms) => Some(*ms),
            Self::Templated(_) => None,
        }
    }

    pub fn is_templated(&self) -> bool {
        matches!(self, Self::Templated(_))
    }

    /// Resolve a templated setting with `render`. Output that is not a
    /// non-negative number yields `None`.
    pub fn resolve(&self, render: impl FnOnce(&str) -> Value) -> Option<u64> {
        match self {
            Self::Fixed(ms) => Some(*ms),
            Self::Templated(template) => {
                let rendered = render(template);
                let ms = match &rendered {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map(|ms| ms.round() as u64);
                if ms.is_none() {
                    warn!(
                        target: "remotekit::config",
                        %template, %rendered,
                        "Timing template did not render to milliseconds; using the default"
                    );
                }
                ms
            }
        }
    }
}

impl From<u64> for Millis {
    fn from(ms: u64) -> Self {
        Self::Fixed(ms)
    }
}

/// Kind-specific payload of an [`ActionDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ActionKind {
    /// Send a remote key command.
    Key { key: String },

    /// Switch the remote to a source / activity.
    Source { source: String },

    /// Call a `domain.service` with parameters.
    #[serde(alias = "perform-action")]
    CallService {
        #[serde(alias = "perform_action")]
        service: String,
        #[serde(default)]
        data: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        target: Map<String, Value>,
    },

    /// Navigate the host to a local path.
    Navigate {
        navigation_path: String,
        #[serde(default)]
        navigation_replace: bool,
    },

    /// Open an external URL.
    Url { url_path: String },

    /// Trigger voice assist.
    Assist {
        #[serde(default)]
        pipeline_id: Option<String>,
        #[serde(default)]
        start_listening: Option<bool>,
    },

    /// Open the info panel of `data.entity_id`.
    MoreInfo {
        #[serde(default)]
        data: Map<String, Value>,
    },

    /// Emit a custom event carrying the whole descriptor.
    FireDomEvent {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },

    /// Hold policy: re-fire the tap action on an interval while held.
    Repeat,

    None,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Source { .. } => "source",
            Self::CallService { .. } => "call-service",
            Self::Navigate { .. } => "navigate",
            Self::Url { .. } => "url",
            Self::Assist { .. } => "assist",
            Self::MoreInfo { .. } => "more-info",
            Self::FireDomEvent { .. } => "fire-dom-event",
            Self::Repeat => "repeat",
            Self::None => "none",
        }
    }
}

/// Confirmation policy: a plain switch, a prompt with exemptions, or a template
/// rendering to either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Confirmation {
    Enabled(bool),
    Templated(String),
    Prompt(ConfirmationPrompt),
}

impl Confirmation {
    /// Interpret the output of a rendered [`Confirmation::Templated`] policy.
    ///
    /// `false`, `"false"`, `""`, `0` and `null` disable the prompt; an object is
    /// read as a prompt; anything else enables the default prompt.
    pub fn from_rendered(value: Value) -> Self {
        match value {
            Value::Bool(enabled) => Self::Enabled(enabled),
            Value::Null => Self::Enabled(false),
            Value::Number(n) => Self::Enabled(n.as_f64() != Some(0.0)),
            Value::String(s) => {
                let s = s.trim();
                Self::Enabled(!(s.is_empty() || s.eq_ignore_ascii_case("false")))
            }
            Value::Object(map) => serde_json::from_value(Value::Object(map))
                .map(Self::Prompt)
                .unwrap_or(Self::Enabled(true)),
            Value::Array(_) => Self::Enabled(true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfirmationPrompt {
    /// Custom prompt text (templated).
    #[serde(default)]
    pub text: Option<String>,

    /// Users that skip the prompt.
    #[serde(default)]
    pub exemptions: Option<Vec<Exemption>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Exemption {
    /// User id (templated).
    pub user: String,
}

/// Touchpad behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TouchpadConfig {
    /// Recognise double clicks (delays single clicks by the window).
    #[serde(default)]
    pub enable_double_click: bool,

    /// Named action for a double click (default: `back`).
    #[serde(default)]
    pub double_click_keycode: Option<String>,

    /// Named action for a long press without direction (default: `center` as a long press).
    #[serde(default)]
    pub long_click_keycode: Option<String>,

    /// Long-press delay in milliseconds (default: 500).
    #[serde(default)]
    pub long_press_ms: Option<u64>,

    /// Directional repeat interval in milliseconds (default: 100).
    #[serde(default)]
    pub repeat_ms: Option<u64>,

    /// Double-click window in milliseconds (default: 200).
    #[serde(default)]
    pub double_click_window_ms: Option<u64>,

    /// Minimum displacement before a move counts as a direction (default: 0).
    #[serde(default)]
    pub swipe_threshold: Option<f64>,
}

/// Input source configuration.
/// - "stdin": newline-delimited JSON input lines from standard input
/// - "replay": the same lines read from a file, honouring `after_ms` delays
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Stdin,
    Replay {
        /// Path to the NDJSON file.
        path: String,
    },
}
