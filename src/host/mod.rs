/*!
Host collaborators.

The remote core never renders, prompts or performs commands itself. It consumes
these narrow interfaces:

- `CommandSurface`    : performs resolved commands (service calls, navigation, ...)
- `StateProvider`     : current state and attributes of an entity
- `TemplateEvaluator` : resolves templated parameter values against a context
- `Prompter`          : synchronous yes/no confirmation and free-text entry
- `IdentityProvider`  : current user id (confirmation exemptions)
- `HapticSink`        : fire-and-forget feedback

Concrete implementations used by the binary live in `console` and `states`.
*/

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::gesture::Haptic;
use crate::utils::interpolation::Interpolator;

pub mod console;
pub mod states;

pub use console::{AutoPrompter, ConsoleSurface, LoggingHaptics, StaticIdentity, TtyPrompter};
pub use states::MemoryStates;

/// A fully resolved side effect for the command surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    CallService {
        domain: String,
        service: String,
        data: Map<String, Value>,
    },
    Navigate {
        path: String,
        replace: bool,
    },
    OpenUrl {
        url: String,
    },
    Assist {
        pipeline_id: Option<String>,
        start_listening: Option<bool>,
    },
    MoreInfo {
        entity_id: Option<String>,
    },
    FireEvent {
        payload: Map<String, Value>,
    },
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallService { .. } => "call_service",
            Self::Navigate { .. } => "navigate",
            Self::OpenUrl { .. } => "open_url",
            Self::Assist { .. } => "assist",
            Self::MoreInfo { .. } => "more_info",
            Self::FireEvent { .. } => "fire_event",
        }
    }
}

/// Snapshot of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

pub trait CommandSurface: Send + Sync {
    fn execute(&self, command: &Command) -> Result<()>;
}

pub trait StateProvider: Send + Sync {
    /// `None` when the entity is unknown.
    fn get(&self, entity_id: &str) -> Option<EntityState>;
}

pub trait TemplateEvaluator: Send + Sync {
    /// Resolve `value` against `context`. Non-template input passes through unchanged.
    fn render(&self, value: &Value, context: &Map<String, Value>) -> Value;
}

pub trait Prompter: Send + Sync {
    /// Ask the user; `Ok(false)` means declined.
    fn confirm(&self, text: &str) -> Result<bool>;

    /// Ask for a line of text; `Ok(None)` when nothing was entered.
    fn text(&self, label: &str) -> Result<Option<String>>;
}

pub trait IdentityProvider: Send + Sync {
    fn user_id(&self) -> Option<String>;
}

pub trait HapticSink: Send + Sync {
    fn feedback(&self, haptic: Haptic);
}

/// The full set of collaborators, shared by every element.
#[derive(Clone)]
pub struct Host {
    pub surface: Arc<dyn CommandSurface>,
    pub states: Arc<dyn StateProvider>,
    pub templates: Arc<dyn TemplateEvaluator>,
    pub prompter: Arc<dyn Prompter>,
    pub identity: Arc<dyn IdentityProvider>,
    pub haptics: Arc<dyn HapticSink>,
}

impl Host {
    /// Console host: commands are logged (`dry_run`) or printed as NDJSON.
    pub fn console(
        dry_run: bool,
        states: Arc<MemoryStates>,
        prompter: Arc<dyn Prompter>,
        user: Option<String>,
    ) -> Self {
        Self {
            surface: Arc::new(ConsoleSurface::new(dry_run)),
            states,
            templates: Arc::new(Interpolator),
            prompter,
            identity: Arc::new(StaticIdentity::new(user)),
            haptics: Arc::new(LoggingHaptics),
        }
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
