//! Console implementations of the host collaborators.
//!
//! `ConsoleSurface` either logs every command (dry-run) or writes it as one JSON line
//! on its writer (stdout by default) for a downstream process to perform.

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;
use tracing::{debug, info, trace};

use super::{Command, CommandSurface, HapticSink, IdentityProvider, Prompter};
use crate::gesture::Haptic;

/// Performs commands by logging or printing them.
pub struct ConsoleSurface {
    dry_run: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSurface {
    /// - dry_run: when true, only logs instead of emitting command lines.
    pub fn new(dry_run: bool) -> Self {
        Self::with_writer(dry_run, Box::new(io::stdout()))
    }

    pub fn with_writer(dry_run: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            dry_run,
            out: Mutex::new(out),
        }
    }

    /// Returns whether the surface is currently in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl CommandSurface for ConsoleSurface {
    fn execute(&self, command: &Command) -> Result<()> {
        if self.dry_run {
            match command {
                Command::CallService {
                    domain,
                    service,
                    data,
                } => {
                    let data = serde_json::Value::Object(data.clone());
                    info!(target: "remotekit::console", %domain, %service, %data, "DRY-RUN call_service");
                }
                Command::Navigate { path, replace } => {
                    info!(target: "remotekit::console", %path, replace, "DRY-RUN navigate");
                }
                Command::OpenUrl { url } => {
                    info!(target: "remotekit::console", %url, "DRY-RUN open_url");
                }
                Command::Assist {
                    pipeline_id,
                    start_listening,
                } => {
                    info!(target: "remotekit::console", ?pipeline_id, ?start_listening, "DRY-RUN assist");
                }
                Command::MoreInfo { entity_id } => {
                    info!(target: "remotekit::console", ?entity_id, "DRY-RUN more_info");
                }
                Command::FireEvent { payload } => {
                    let payload = serde_json::Value::Object(payload.clone());
                    info!(target: "remotekit::console", %payload, "DRY-RUN fire_event");
                }
            }
            return Ok(());
        }

        let mut line = serde_json::to_value(command).context("Failed to serialize command")?;
        if let Some(obj) = line.as_object_mut() {
            obj.insert(
                "ts".into(),
                json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        trace!(target: "remotekit::console", command = command.as_str(), "emit");
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("Command writer lock poisoned"))?;
        serde_json::to_writer(&mut **out, &line).context("Failed to write command")?;
        out.write_all(b"\n").context("Failed to write command")?;
        out.flush().context("Failed to flush command writer")?;
        Ok(())
    }
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompter(pub bool);

impl Prompter for AutoPrompter {
    fn confirm(&self, text: &str) -> Result<bool> {
        info!(target: "remotekit::console", %text, answer = self.0, "Auto-answered confirmation");
        Ok(self.0)
    }

    fn text(&self, label: &str) -> Result<Option<String>> {
        info!(target: "remotekit::console", %label, "No terminal for text entry; skipped");
        Ok(None)
    }
}

/// Asks on the controlling terminal, leaving stdin to the event source.
#[derive(Debug, Clone, Default)]
pub struct TtyPrompter {
    path: Option<String>,
}

impl TtyPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    fn tty_path(&self) -> &str {
        self.path.as_deref().unwrap_or("/dev/tty")
    }

    /// Write `prompt` and read one line back.
    fn ask(&self, prompt: &str) -> Result<String> {
        let path = self.tty_path();
        let mut tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open {path} for prompt"))?;
        write!(tty, "{prompt}").context("Failed to write prompt")?;
        tty.flush().context("Failed to flush prompt")?;

        let mut answer = String::new();
        let read = BufReader::new(tty)
            .read_line(&mut answer)
            .context("Failed to read prompt answer")?;
        if read == 0 {
            bail!("Terminal closed while waiting for an answer");
        }
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Prompter for TtyPrompter {
    fn confirm(&self, text: &str) -> Result<bool> {
        let answer = self.ask(&format!("{text} [y/N] "))?;
        let accepted = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
        debug!(target: "remotekit::console", accepted, "Confirmation answered");
        Ok(accepted)
    }

    fn text(&self, label: &str) -> Result<Option<String>> {
        let answer = self.ask(label)?;
        debug!(target: "remotekit::console", chars = answer.chars().count(), "Text entered");
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }
}

/// Fixed user id.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<String>,
}

impl StaticIdentity {
    pub fn new(user: Option<String>) -> Self {
        Self { user }
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<String> {
        self.user.clone()
    }
}

/// Haptics have nowhere to go on a console; log them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHaptics;

impl HapticSink for LoggingHaptics {
    fn feedback(&self, haptic: Haptic) {
        trace!(target: "remotekit::console", haptic = haptic.as_str(), "haptic");
    }
}
