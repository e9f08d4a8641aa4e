//! Confirmation Gate.
//!
//! Decides whether a descriptor may be dispatched:
//! - no policy, or `false` -> approve
//! - `true` -> prompt with the default message for the action kind
//! - structured -> custom text (or the default), skip the prompt for exempt users
//! - a template string -> rendered first, then read as one of the above
//!
//! A declined prompt is a silent cancellation. A `none` action under any active
//! policy is rejected without prompting.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::error::DispatchError;
use crate::config::{ActionDescriptor, ActionKind, Confirmation};
use crate::gesture::Haptic;
use crate::host::{HapticSink, IdentityProvider, Prompter, TemplateEvaluator};

pub struct ConfirmationGate<'a> {
    pub prompter: &'a dyn Prompter,
    pub identity: &'a dyn IdentityProvider,
    pub templates: &'a dyn TemplateEvaluator,
    /// `None` when haptics are disabled for the element.
    pub haptics: Option<&'a dyn HapticSink>,
    pub context: &'a Map<String, Value>,
}

impl ConfirmationGate<'_> {
    /// `Ok(true)` to proceed, `Ok(false)` to drop the dispatch silently.
    pub fn approve(&self, action: &ActionDescriptor) -> Result<bool, DispatchError> {
        let rendered;
        let policy = match &action.confirmation {
            Some(Confirmation::Templated(template)) => {
                rendered = Confirmation::from_rendered(
                    self.templates
                        .render(&Value::String(template.clone()), self.context),
                );
                debug!(target: "remotekit::dispatch", %template, policy = ?rendered, "confirmation rendered");
                Some(&rendered)
            }
            other => other.as_ref(),
        };
        let prompt = match policy {
            None | Some(Confirmation::Enabled(false)) => return Ok(true),
            Some(Confirmation::Enabled(true) | Confirmation::Templated(_)) => None,
            Some(Confirmation::Prompt(prompt)) => Some(prompt),
        };

        if let Some(haptics) = self.haptics {
            haptics.feedback(Haptic::Warning);
        }

        if action.is_none() {
            debug!(target: "remotekit::dispatch", "Confirmation on a 'none' action; aborting");
            return Ok(false);
        }

        let text = prompt
            .and_then(|p| p.text.as_deref())
            .map(|text| self.render(text))
            .unwrap_or_else(|| self.default_text(&action.kind));

        if let Some(exemptions) = prompt.and_then(|p| p.exemptions.as_ref()) {
            if let Some(user) = self.identity.user_id() {
                if exemptions.iter().any(|e| self.render(&e.user) == user) {
                    debug!(target: "remotekit::dispatch", %user, "User exempt from confirmation");
                    return Ok(true);
                }
            }
        }

        let accepted = self.prompter.confirm(&text).map_err(DispatchError::Prompt)?;
        if !accepted {
            info!(target: "remotekit::dispatch", %text, "Confirmation declined; action dropped");
        }
        Ok(accepted)
    }

    /// Default prompt phrasing, one per action kind.
    pub fn default_text(&self, kind: &ActionKind) -> String {
        match kind {
            ActionKind::Navigate {
                navigation_path, ..
            } => format!(
                "Are you sure you want to navigate to '{}'?",
                self.render(navigation_path)
            ),
            ActionKind::Url { url_path } => {
                format!("Are you sure you want to open '{}'?", self.render(url_path))
            }
            ActionKind::Assist { .. } => "Are you sure you want to call assist?".to_string(),
            ActionKind::CallService { service, .. } => format!(
                "Are you sure you want to run action '{}'?",
                self.render(service)
            ),
            ActionKind::Source { source } => format!(
                "Are you sure you want to switch to source '{}'?",
                self.render(source)
            ),
            ActionKind::Key { key } => {
                format!("Are you sure you want to send key '{}'?", self.render(key))
            }
            other => format!("Are you sure you want to run '{}'?", other.as_str()),
        }
    }

    fn render(&self, text: &str) -> String {
        match self
            .templates
            .render(&Value::String(text.to_string()), self.context)
        {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfirmationPrompt, Exemption};
    use crate::host::StaticIdentity;
    use crate::testing::{RecordingHaptics, ScriptedPrompter};
    use crate::utils::interpolation::Interpolator;
    use serde_json::json;

    struct Fixture {
        prompter: ScriptedPrompter,
        identity: StaticIdentity,
        haptics: RecordingHaptics,
        context: Map<String, Value>,
    }

    impl Fixture {
        fn new(answer: bool, user: Option<&str>) -> Self {
            Self {
                prompter: ScriptedPrompter::answering(answer),
                identity: StaticIdentity::new(user.map(str::to_string)),
                haptics: RecordingHaptics::default(),
                context: json!({ "config": { "owner": "abc" } })
                    .as_object()
                    .cloned()
                    .unwrap(),
            }
        }

        fn gate(&self) -> ConfirmationGate<'_> {
            ConfirmationGate {
                prompter: &self.prompter,
                identity: &self.identity,
                templates: &Interpolator,
                haptics: Some(&self.haptics),
                context: &self.context,
            }
        }
    }

    fn exempt(users: &[&str]) -> Confirmation {
        Confirmation::Prompt(ConfirmationPrompt {
            text: None,
            exemptions: Some(
                users
                    .iter()
                    .map(|u| Exemption {
                        user: u.to_string(),
                    })
                    .collect(),
            ),
        })
    }

    #[test]
    fn no_policy_or_false_approves_without_prompt() {
        let f = Fixture::new(false, None);
        assert!(f.gate().approve(&ActionDescriptor::key("A")).unwrap());
        let off = ActionDescriptor::key("A").with_confirmation(Confirmation::Enabled(false));
        assert!(f.gate().approve(&off).unwrap());
        assert!(f.prompter.asked().is_empty());
        assert!(f.haptics.seen().is_empty());
    }

    #[test]
    fn true_prompts_with_kind_specific_text() {
        let f = Fixture::new(true, None);
        let action = ActionDescriptor::source("netflix://").with_confirmation(Confirmation::Enabled(true));
        assert!(f.gate().approve(&action).unwrap());
        assert_eq!(
            f.prompter.asked(),
            vec!["Are you sure you want to switch to source 'netflix://'?".to_string()]
        );
        assert_eq!(f.haptics.seen(), vec![Haptic::Warning]);
    }

    #[test]
    fn default_texts_are_distinct() {
        let f = Fixture::new(true, None);
        let gate = f.gate();
        let kinds = [
            ActionKind::Navigate {
                navigation_path: "/a".into(),
                navigation_replace: false,
            },
            ActionKind::Url {
                url_path: "/a".into(),
            },
            ActionKind::Assist {
                pipeline_id: None,
                start_listening: None,
            },
            ActionKind::CallService {
                service: "/a".into(),
                data: Map::new(),
                target: Map::new(),
            },
            ActionKind::Source { source: "/a".into() },
            ActionKind::Key { key: "/a".into() },
        ];
        let texts: std::collections::HashSet<String> =
            kinds.iter().map(|k| gate.default_text(k)).collect();
        assert_eq!(texts.len(), kinds.len());
    }

    #[test]
    fn exempt_user_skips_prompt() {
        let f = Fixture::new(false, Some("abc"));
        let action = ActionDescriptor::key("POWER").with_confirmation(exempt(&["{{ config.owner }}"]));
        assert!(f.gate().approve(&action).unwrap());
        assert!(f.prompter.asked().is_empty());
    }

    #[test]
    fn other_user_is_prompted_and_can_decline() {
        let f = Fixture::new(false, Some("xyz"));
        let action = ActionDescriptor::key("POWER").with_confirmation(exempt(&["abc"]));
        assert!(!f.gate().approve(&action).unwrap());
        assert_eq!(f.prompter.asked().len(), 1);
    }

    #[test]
    fn custom_text_is_rendered() {
        let f = Fixture::new(true, None);
        let action = ActionDescriptor::key("POWER").with_confirmation(Confirmation::Prompt(
            ConfirmationPrompt {
                text: Some("Owner {{ config.owner }}?".into()),
                exemptions: None,
            },
        ));
        assert!(f.gate().approve(&action).unwrap());
        assert_eq!(f.prompter.asked(), vec!["Owner abc?".to_string()]);
    }

    #[test]
    fn none_action_aborts_without_prompt() {
        let f = Fixture::new(true, None);
        let action = ActionDescriptor::none().with_confirmation(Confirmation::Enabled(true));
        assert!(!f.gate().approve(&action).unwrap());
        assert!(f.prompter.asked().is_empty());
    }

    #[test]
    fn templated_policy_is_rendered_before_use() {
        let f = Fixture {
            context: json!({ "VALUE": "off", "config": { "guard": true, "ask": { "text": "Owner?" } } })
                .as_object()
                .cloned()
                .unwrap(),
            ..Fixture::new(true, None)
        };
        let templated = |t: &str| ActionDescriptor::key("POWER").with_confirmation(Confirmation::Templated(t.into()));

        assert!(f.gate().approve(&templated("{{ config.guard }}")).unwrap());
        assert!(f.gate().approve(&templated("{{ config.ask }}")).unwrap());
        assert!(f.gate().approve(&templated("false")).unwrap());
        assert!(f.gate().approve(&templated("{{ config.missing_flag }}")).unwrap());
        assert_eq!(
            f.prompter.asked(),
            vec![
                "Are you sure you want to send key 'POWER'?".to_string(),
                "Owner?".to_string(),
                "Are you sure you want to send key 'POWER'?".to_string(),
            ]
        );
    }

    #[test]
    fn prompt_failure_is_an_error() {
        let f = Fixture {
            prompter: ScriptedPrompter::failing(),
            ..Fixture::new(true, None)
        };
        let action = ActionDescriptor::key("A").with_confirmation(Confirmation::Enabled(true));
        assert!(matches!(
            f.gate().approve(&action),
            Err(DispatchError::Prompt(_))
        ));
    }
}
