use serde_json::{Map, Value};
use tracing::{debug, error, info, trace, warn};

use super::confirm::ConfirmationGate;
use super::error::DispatchError;
use super::resolver::KeyMap;
use crate::config::{ActionDescriptor, ActionKind, RemoteConfig, defaults};
use crate::host::{Command, HapticSink, Host};

/// Hold duration sent with a key when a tap action is reused for a long press.
pub const LONG_PRESS_SECS: f64 = 0.5;

/// Target fields that disable auto-fill when present.
const TARGET_FIELDS: &[&str] = &["entity_id", "device_id", "area_id"];

/// Remote keys that prompt for text and send it through the ADB bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEntry {
    Type,
    Search,
}

impl TextEntry {
    fn for_key(key: &str) -> Option<Self> {
        match key {
            "KEYBOARD" | "TEXTBOX" => Some(Self::Type),
            "SEARCH" => Some(Self::Search),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Type => "Text Input: ",
            Self::Search => "Google Assistant Search: ",
        }
    }

    fn shell_command(self, text: &str) -> String {
        let text = shell_quote(text);
        match self {
            Self::Type => format!("input text \"{text}\""),
            Self::Search => format!(
                "am start -a \"android.search.action.GLOBAL_SEARCH\" --es query \"{text}\""
            ),
        }
    }
}

/// One dispatch request.
#[derive(Debug, Clone, Copy)]
pub struct Dispatch<'a> {
    pub action: &'a ActionDescriptor,
    /// Long-press duration for key commands, when the gesture was a hold.
    pub hold_secs: Option<f64>,
    /// Template context (`VALUE`, `HOLD_SECS`, `config`).
    pub context: &'a Map<String, Value>,
    /// Element-level haptics switch.
    pub haptics: bool,
}

/// Action Dispatcher: turns descriptors into commands on the host surface.
///
/// Shared by every element of one configuration; rebuilt on reconfiguration.
#[derive(Debug)]
pub struct Dispatcher {
    host: Host,
    remote_id: Option<String>,
    media_player_id: Option<String>,
    adb_id: Option<String>,
    autofill: bool,
    keys: KeyMap,
}

impl Dispatcher {
    pub fn new(host: Host, cfg: &RemoteConfig) -> Self {
        Self {
            host,
            remote_id: cfg.remote_id.clone(),
            media_player_id: cfg.media_player_id.clone(),
            adb_id: cfg.adb_id.clone(),
            autofill: cfg.autofill_entity_id,
            keys: KeyMap::from_config(cfg),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    /// Confirm, then perform. A declined confirmation returns `Ok(())`.
    pub fn dispatch(&self, req: Dispatch<'_>) -> Result<(), DispatchError> {
        let gate = ConfirmationGate {
            prompter: self.host.prompter.as_ref(),
            identity: self.host.identity.as_ref(),
            templates: self.host.templates.as_ref(),
            haptics: req
                .haptics
                .then_some(self.host.haptics.as_ref() as &dyn HapticSink),
            context: req.context,
        };
        if !gate.approve(req.action)? {
            return Ok(());
        }

        let command = match self.text_entry(&req) {
            Some(entry) => {
                let typed = self
                    .host
                    .prompter
                    .text(entry.label())
                    .map_err(DispatchError::Prompt)?;
                match typed.filter(|t| !t.is_empty()) {
                    Some(text) => Some(self.adb_command(entry.shell_command(&text), req.context)),
                    None => {
                        debug!(target: "remotekit::dispatch", "No text entered; nothing sent");
                        None
                    }
                }
            }
            None => self.command_for(&req),
        };
        match command {
            Some(command) => self.perform(command),
            None => Ok(()),
        }
    }

    /// Type `text` on the device through the ADB bridge. Empty text sends nothing.
    pub fn send_text(&self, text: &str) -> Result<(), DispatchError> {
        if text.is_empty() {
            return Ok(());
        }
        self.perform(self.adb_command(TextEntry::Type.shell_command(text), &Map::new()))
    }

    /// Forward a non-printing key typed into a text field as its named action.
    ///
    /// Keys without a mapping (`Shift`, `Tab`, ...) are ignored.
    pub fn key_down(&self, key: &str) -> Result<(), DispatchError> {
        let Some(name) = defaults::keydown_action(key) else {
            trace!(target: "remotekit::dispatch", %key, "unmapped key ignored");
            return Ok(());
        };
        let action = self.keys.resolve(name);
        self.dispatch(Dispatch {
            action: &action,
            hold_secs: None,
            context: &Map::new(),
            haptics: false,
        })
    }

    fn perform(&self, command: Command) -> Result<(), DispatchError> {
        debug!(target: "remotekit::dispatch", command = command.as_str(), "dispatching");
        self.host
            .surface
            .execute(&command)
            .map_err(|source| DispatchError::Surface {
                command: command.as_str(),
                source,
            })
    }

    fn text_entry(&self, req: &Dispatch<'_>) -> Option<TextEntry> {
        match &req.action.kind {
            ActionKind::Key { key } => TextEntry::for_key(&self.render_string(key, req.context)),
            _ => None,
        }
    }

    fn adb_command(&self, command: String, ctx: &Map<String, Value>) -> Command {
        let mut data = Map::new();
        match &self.adb_id {
            Some(adb) => {
                data.insert("entity_id".into(), self.render_value(adb, ctx));
            }
            None => warn!(target: "remotekit::dispatch", "No adb_id configured; sending ADB command without target"),
        }
        data.insert("command".into(), Value::String(command));
        call("androidtv", "adb_command", data)
    }

    /// Build the command for a descriptor. `None` means nothing to perform.
    pub fn command_for(&self, req: &Dispatch<'_>) -> Option<Command> {
        let ctx = req.context;
        match &req.action.kind {
            ActionKind::Key { key } => {
                let mut data = Map::new();
                if let Some(remote) = &self.remote_id {
                    data.insert("entity_id".into(), self.render_value(remote, ctx));
                } else {
                    warn!(target: "remotekit::dispatch", %key, "No remote_id configured; sending key without target");
                }
                data.insert("command".into(), self.render_value(key, ctx));
                if let Some(secs) = req.hold_secs {
                    data.insert("hold_secs".into(), Value::from(secs));
                }
                Some(call("remote", "send_command", data))
            }

            ActionKind::Source { source } => {
                let mut data = Map::new();
                if let Some(remote) = &self.remote_id {
                    data.insert("entity_id".into(), self.render_value(remote, ctx));
                }
                data.insert("activity".into(), self.render_value(source, ctx));
                Some(call("remote", "turn_on", data))
            }

            ActionKind::CallService {
                service,
                data,
                target,
            } => self.service_call(service, data, target, req),

            ActionKind::Navigate {
                navigation_path,
                navigation_replace,
            } => {
                let path = self.render_string(navigation_path, ctx);
                if path.contains("//") {
                    error!(
                        target: "remotekit::dispatch",
                        %path,
                        "Protocol detected in navigation path; use the 'url' action with 'url_path' instead"
                    );
                    return None;
                }
                Some(Command::Navigate {
                    path,
                    replace: *navigation_replace,
                })
            }

            ActionKind::Url { url_path } => {
                let mut url = self.render_string(url_path, ctx);
                if !url.contains("//") {
                    url = format!("https://{url}");
                }
                Some(Command::OpenUrl { url })
            }

            ActionKind::Assist {
                pipeline_id,
                start_listening,
            } => Some(Command::Assist {
                pipeline_id: pipeline_id.as_deref().map(|p| self.render_string(p, ctx)),
                start_listening: *start_listening,
            }),

            ActionKind::MoreInfo { data } => {
                let entity_id = data
                    .get("entity_id")
                    .map(|v| self.host.templates.render(v, ctx))
                    .and_then(|v| v.as_str().map(str::to_string));
                Some(Command::MoreInfo { entity_id })
            }

            ActionKind::FireDomEvent { .. } => {
                let payload = match serde_json::to_value(req.action) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => Map::new(),
                    Err(err) => {
                        warn!(target: "remotekit::dispatch", error = %err, "Failed to serialize event payload");
                        return None;
                    }
                };
                Some(Command::FireEvent { payload })
            }

            ActionKind::Repeat | ActionKind::None => {
                trace!(target: "remotekit::dispatch", action = req.action.kind.as_str(), "nothing to dispatch");
                None
            }
        }
    }

    fn service_call(
        &self,
        service: &str,
        data: &Map<String, Value>,
        target: &Map<String, Value>,
        req: &Dispatch<'_>,
    ) -> Option<Command> {
        let ctx = req.context;
        let rendered = self.render_string(service, ctx);
        let Some((domain, name)) = rendered
            .split_once('.')
            .filter(|(d, s)| !d.is_empty() && !s.is_empty())
        else {
            warn!(target: "remotekit::dispatch", service = %rendered, "Malformed service name; expected 'domain.service'");
            return None;
        };

        let mut data = match self
            .host
            .templates
            .render(&Value::Object(data.clone()), ctx)
        {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Value::Object(target) = self.host.templates.render(&Value::Object(target.clone()), ctx)
        {
            for (key, value) in target {
                data.entry(key).or_insert(value);
            }
        }

        if self.autofill && !TARGET_FIELDS.iter().any(|f| data.contains_key(*f)) {
            let default_target = match domain {
                "remote" => self.remote_id.as_ref(),
                "media_player" | "kodi" | "denonavr" => self.media_player_id.as_ref(),
                _ => None,
            };
            if let Some(entity_id) = default_target {
                info!(target: "remotekit::dispatch", %domain, %entity_id, "Auto-filled service target");
                data.insert("entity_id".into(), Value::String(entity_id.clone()));
            }
        }

        if let Some(secs) = req.hold_secs {
            if domain == "remote" && name == "send_command" && !data.contains_key("hold_secs") {
                data.insert("hold_secs".into(), Value::from(secs));
            }
        }

        Some(call(domain, name, data))
    }

    fn render_value(&self, text: &str, ctx: &Map<String, Value>) -> Value {
        self.host
            .templates
            .render(&Value::String(text.to_string()), ctx)
    }

    fn render_string(&self, text: &str, ctx: &Map<String, Value>) -> String {
        match self.render_value(text, ctx) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Escape text for a double-quoted device shell argument.
fn shell_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn call(domain: &str, service: &str, data: Map<String, Value>) -> Command {
    Command::CallService {
        domain: domain.to_string(),
        service: service.to_string(),
        data,
    }
}
