//! In-memory entity state store fed by `state` input lines.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{trace, warn};

use super::{EntityState, StateProvider};

#[derive(Debug, Default)]
pub struct MemoryStates {
    entities: RwLock<HashMap<String, EntityState>>,
}

impl MemoryStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the state of an entity.
    pub fn set(&self, entity_id: impl Into<String>, state: EntityState) {
        let entity_id = entity_id.into();
        trace!(target: "remotekit::states", entity = %entity_id, state = %state.state, "update");
        match self.entities.write() {
            Ok(mut guard) => {
                guard.insert(entity_id, state);
            }
            Err(_) => warn!(target: "remotekit::states", entity = %entity_id, "State store poisoned; update dropped"),
        }
    }

    pub fn remove(&self, entity_id: &str) -> Option<EntityState> {
        self.entities.write().ok()?.remove(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entities.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateProvider for MemoryStates {
    fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.entities.read().ok()?.get(entity_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove() {
        let states = MemoryStates::new();
        assert!(states.get("light.den").is_none());
        states.set(
            "light.den",
            EntityState::new("on").with_attribute("brightness", json!(128)),
        );
        assert_eq!(states.len(), 1);
        assert_eq!(states.get("light.den").unwrap().attributes["brightness"], json!(128));
        states.remove("light.den");
        assert!(states.is_empty());
    }
}
