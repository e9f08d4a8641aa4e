//! Action Resolver.
//!
//! Two pure lookups:
//! - slot resolution inside an [`ActionSet`], following the fixed fallback chains
//! - name resolution through the key tables (`custom_keys` > `custom_sources` >
//!   built-in keys > built-in sources > nothing)

use serde_json::{Map, Value};
use tracing::trace;

use crate::config::{
    ActionDescriptor, ActionKind, ActionSet, ActionSlot, KeyEntry, KeyTable, RemoteConfig,
    defaults,
};

impl ActionSet {
    /// Descriptor configured for `slot`, or the first configured slot in its fallback chain.
    ///
    /// Returns the slot the descriptor was actually found in. An explicitly configured
    /// `none` stops the chain.
    pub fn resolve(&self, slot: ActionSlot) -> Option<(ActionSlot, &ActionDescriptor)> {
        use ActionSlot::*;
        let chain: &[ActionSlot] = match slot {
            Tap => &[Tap],
            Hold => &[Hold, Tap],
            DoubleTap => &[DoubleTap, Tap],
            MultiTap => &[MultiTap, Tap],
            MultiHold => &[MultiHold, Hold, MultiTap, Tap],
            MultiDoubleTap => &[MultiDoubleTap, DoubleTap, MultiTap, Tap],
            MomentaryStart => &[MomentaryStart],
            MomentaryEnd => &[MomentaryEnd],
        };
        chain
            .iter()
            .find_map(|candidate| self.get(*candidate).map(|action| (*candidate, action)))
    }

    /// The descriptor stored in exactly `slot`, without fallback.
    pub fn get(&self, slot: ActionSlot) -> Option<&ActionDescriptor> {
        match slot {
            ActionSlot::Tap => self.tap.as_ref(),
            ActionSlot::Hold => self.hold.as_ref(),
            ActionSlot::DoubleTap => self.double_tap.as_ref(),
            ActionSlot::MultiTap => self.multi_tap.as_ref(),
            ActionSlot::MultiHold => self.multi_hold.as_ref(),
            ActionSlot::MultiDoubleTap => self.multi_double_tap.as_ref(),
            ActionSlot::MomentaryStart => self.momentary_start.as_ref(),
            ActionSlot::MomentaryEnd => self.momentary_end.as_ref(),
        }
    }
}

impl From<&KeyEntry> for ActionDescriptor {
    fn from(entry: &KeyEntry) -> Self {
        match entry {
            KeyEntry::Key { key } => ActionDescriptor::key(key.clone()),
            KeyEntry::Source { source } => ActionDescriptor::source(source.clone()),
            KeyEntry::Service {
                service,
                service_data,
            } => ActionDescriptor::service(service.clone(), service_data.clone()),
        }
    }
}

/// Snapshot of the named-action tables of one configuration.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    custom_keys: KeyTable,
    custom_sources: KeyTable,
}

impl KeyMap {
    pub fn new(custom_keys: KeyTable, custom_sources: KeyTable) -> Self {
        Self {
            custom_keys,
            custom_sources,
        }
    }

    pub fn from_config(cfg: &RemoteConfig) -> Self {
        Self::new(cfg.custom_keys.clone(), cfg.custom_sources.clone())
    }

    /// Resolve a symbolic name. Unknown names resolve to a `none` descriptor.
    pub fn resolve(&self, name: &str) -> ActionDescriptor {
        let resolved = if let Some(entry) = self.custom_keys.get(name) {
            ActionDescriptor::from(entry)
        } else if let Some(entry) = self.custom_sources.get(name) {
            ActionDescriptor::from(entry)
        } else if let Some(key) = defaults::default_key(name) {
            ActionDescriptor::key(key)
        } else if let Some(source) = defaults::default_source(name) {
            ActionDescriptor::source(source)
        } else {
            ActionDescriptor::none()
        };
        trace!(target: "remotekit::dispatch", %name, kind = resolved.kind.as_str(), "resolved name");
        resolved
    }

    /// Action set of a button that only names an action.
    ///
    /// Repeatable keys (arrows, volume, delete) repeat while held; everything else
    /// reuses the tap action for the hold slot, which then dispatches as a long press.
    pub fn named_button(&self, name: &str) -> ActionSet {
        let mut actions = ActionSet {
            tap: Some(self.resolve(name)),
            ..ActionSet::default()
        };
        if defaults::is_repeatable(name) {
            actions.hold = Some(ActionDescriptor::new(ActionKind::Repeat));
        }
        actions
    }
}

/// `entity_id` carried in a descriptor's data block, if any.
pub(crate) fn data_entity_id(action: &ActionDescriptor) -> Option<&Value> {
    let data: &Map<String, Value> = match &action.kind {
        ActionKind::CallService { data, .. } | ActionKind::MoreInfo { data } => data,
        _ => return None,
    };
    data.get("entity_id")
}
