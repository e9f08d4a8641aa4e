use anyhow::{Context, Result, bail};
use schemars::{Schema, schema_for};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use super::defaults;
use super::models::{
    ActionDescriptor, ActionSet, ActionSlot, ElementConfig, ElementKind, Millis, RemoteConfig,
    SourceConfig,
};

/// Load configuration from a string slice.
pub fn load_from_str(s: &str) -> Result<RemoteConfig> {
    let cfg: RemoteConfig =
        serde_json::from_str(s).context("Failed to parse JSON config string into RemoteConfig")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<RemoteConfig> {
    let cfg: RemoteConfig =
        serde_json::from_reader(reader).context("Failed to parse JSON config from reader")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RemoteConfig> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open config file {}", path_ref.display()))?;
    let cfg = load_from_reader(file)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<RemoteConfig> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;
    let cfg: RemoteConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON config from {}", path_ref.display()))?;
    validate_config(&cfg)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Generate the JSON Schema for the RemoteConfig model.
pub fn generate_schema() -> Schema {
    schema_for!(RemoteConfig)
}

/// Write the JSON Schema for the RemoteConfig model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Sanity checks.
///
/// Hard errors are limited to things that cannot run (empty ids, a zero repeat
/// interval, a replay source without a path). Everything else is a configuration
/// gap: logged, and resolved to a no-op at dispatch time.
pub fn validate_config(cfg: &RemoteConfig) -> Result<()> {
    for (id, element) in &cfg.elements {
        if id.trim().is_empty() {
            bail!("Element ids must not be empty");
        }
        validate_element(id, element, cfg).with_context(|| format!("Invalid element '{id}'"))?;
    }

    if cfg.touchpad.repeat_ms == Some(0) {
        bail!("touchpad.repeat_ms must be greater than zero");
    }
    if let Some(name) = &cfg.touchpad.long_click_keycode {
        warn_unknown_name(cfg, name, "touchpad.long_click_keycode");
    }
    if let Some(name) = &cfg.touchpad.double_click_keycode {
        warn_unknown_name(cfg, name, "touchpad.double_click_keycode");
    }

    for (idx, source) in cfg.sources.iter().enumerate() {
        if let SourceConfig::Replay { path } = source {
            if path.trim().is_empty() {
                bail!("Replay source at index {idx} has an empty path");
            }
        }
    }

    Ok(())
}

fn validate_element(id: &str, element: &ElementConfig, cfg: &RemoteConfig) -> Result<()> {
    let actions = &element.actions;

    for (name, hold) in [("hold_action", &actions.hold), ("multi_hold_action", &actions.multi_hold)] {
        let Some(hold) = hold else { continue };
        if hold.repeat_delay.as_ref().and_then(Millis::fixed) == Some(0) {
            bail!("{name}.repeat_delay must be greater than zero");
        }
        if hold.hold_time.as_ref().and_then(Millis::fixed) == Some(0) {
            warn!(
                target: "remotekit::config",
                element = %id,
                "{name}.hold_time is zero; every press becomes a hold"
            );
        }
    }

    for (slot, action) in slots(actions) {
        if action.is_repeat() && !matches!(slot, ActionSlot::Hold | ActionSlot::MultiHold) {
            warn!(
                target: "remotekit::config",
                element = %id, slot = slot.as_str(),
                "'repeat' only applies to hold slots; it is a no-op here"
            );
        }
    }

    match element.kind {
        ElementKind::Touchpad => {
            if slots(actions).next().is_some() {
                warn!(
                    target: "remotekit::config",
                    element = %id,
                    "Touchpad elements use the named touchpad actions; action slots are ignored"
                );
            }
        }
        ElementKind::Button => {
            if actions.tap.is_none() && actions.momentary_start.is_none() {
                match &element.key {
                    Some(name) => warn_unknown_name(cfg, name, id),
                    None => warn!(
                        target: "remotekit::config",
                        element = %id,
                        "Button has neither a tap action nor a key; taps are no-ops"
                    ),
                }
            }
        }
    }

    Ok(())
}

fn slots(actions: &ActionSet) -> impl Iterator<Item = (ActionSlot, &ActionDescriptor)> {
    [
        (ActionSlot::Tap, &actions.tap),
        (ActionSlot::Hold, &actions.hold),
        (ActionSlot::DoubleTap, &actions.double_tap),
        (ActionSlot::MultiTap, &actions.multi_tap),
        (ActionSlot::MultiHold, &actions.multi_hold),
        (ActionSlot::MultiDoubleTap, &actions.multi_double_tap),
        (ActionSlot::MomentaryStart, &actions.momentary_start),
        (ActionSlot::MomentaryEnd, &actions.momentary_end),
    ]
    .into_iter()
    .filter_map(|(slot, action)| action.as_ref().map(|a| (slot, a)))
}

fn warn_unknown_name(cfg: &RemoteConfig, name: &str, origin: &str) {
    let known = cfg.custom_keys.contains_key(name)
        || cfg.custom_sources.contains_key(name)
        || defaults::default_key(name).is_some()
        || defaults::default_source(name).is_some();
    if !known {
        warn!(
            target: "remotekit::config",
            %origin, %name,
            "Named action is not defined; it resolves to a no-op"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let cfg = load_from_str(
            r#"{
                "remote_id": "remote.tv",
                "elements": {
                    "up": { "key": "up" },
                    "pad": { "kind": "touchpad" },
                    "vol": {
                        "tap_action": { "action": "key", "key": "VOLUME_UP" },
                        "hold_action": { "action": "repeat", "repeat_delay": 50 }
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.remote_id.as_deref(), Some("remote.tv"));
        assert_eq!(cfg.elements.len(), 3);
        assert_eq!(cfg.elements["pad"].kind, ElementKind::Touchpad);
    }

    #[test]
    fn rejects_zero_repeat_delay() {
        let err = load_from_str(
            r#"{ "elements": { "vol": { "hold_action": { "action": "repeat", "repeat_delay": 0 } } } }"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("repeat_delay"));

        let err = load_from_str(
            r#"{ "elements": { "vol": { "multi_hold_action": { "action": "repeat", "repeat_delay": 0 } } } }"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("multi_hold_action.repeat_delay"));
    }

    #[test]
    fn templated_repeat_delay_is_not_validated_early() {
        let cfg = load_from_str(
            r#"{ "elements": { "vol": { "hold_action": { "action": "repeat", "repeat_delay": "{{ config.speed }}" } } } }"#,
        )
        .unwrap();
        assert!(cfg.elements["vol"].actions.hold.as_ref().unwrap().has_templated_timing());
    }

    #[test]
    fn rejects_empty_replay_path() {
        let err = load_from_str(r#"{ "sources": [{ "type": "replay", "path": " " }] }"#).unwrap_err();
        assert!(err.to_string().contains("empty path"));
    }

    #[test]
    fn unknown_key_is_not_an_error() {
        load_from_str(r#"{ "elements": { "x": { "key": "does_not_exist" } } }"#).unwrap();
    }

    #[test]
    fn schema_is_serializable() {
        let mut out = Vec::new();
        write_schema_to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("RemoteConfig"));
    }
}
