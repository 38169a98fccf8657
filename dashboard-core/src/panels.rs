//! State-dependent panels
//!
//! Every panel carries zero or more system-state tags. Exactly one state is active
//! at a time, and a tagged panel is visible iff one of its tags equals the active
//! state. Untagged panels (such as the cruise-control panel) are never touched by
//! state transitions and can only be shown or hidden directly.

use crate::config::PanelConfig;
use crate::types::TelemetryValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier of a controller operating state
///
/// The controller sends small integers; they are kept in their decimal text form so
/// that `2`, `2.0` and `"2"` all name the same state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        StateId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret a `systemState` value; maps, lists and null are not states
    pub fn from_value(value: &TelemetryValue) -> Option<Self> {
        match value {
            TelemetryValue::Integer(v) => Some(StateId(v.to_string())),
            TelemetryValue::Number(v) if v.is_finite() => {
                if v.fract() == 0.0 {
                    Some(StateId((*v as i64).to_string()))
                } else {
                    Some(StateId(v.to_string()))
                }
            }
            TelemetryValue::Text(s) if !s.is_empty() => Some(StateId(s.clone())),
            TelemetryValue::Bool(b) => Some(StateId(b.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for StateId {
    fn from(value: i32) -> Self {
        StateId(value.to_string())
    }
}

impl From<i64> for StateId {
    fn from(value: i64) -> Self {
        StateId(value.to_string())
    }
}

impl From<u32> for StateId {
    fn from(value: u32) -> Self {
        StateId(value.to_string())
    }
}

impl From<&str> for StateId {
    fn from(value: &str) -> Self {
        StateId(value.to_string())
    }
}

impl From<String> for StateId {
    fn from(value: String) -> Self {
        StateId(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStateId {
    Integer(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for StateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawStateId::deserialize(deserializer)? {
            RawStateId::Integer(v) => StateId::from(v),
            RawStateId::Text(s) => StateId(s),
        })
    }
}

/// A visual unit whose visibility the dashboard controls
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: String,
    pub tags: Vec<StateId>,
    visible: bool,
}

impl Panel {
    /// Create a panel; panels start out visible until the first state transition
    pub fn new(id: impl Into<String>, tags: Vec<StateId>) -> Self {
        Self {
            id: id.into(),
            tags,
            visible: true,
        }
    }

    /// Build a panel from an element id following the `state_<a>_<b>_` convention
    ///
    /// Returns `None` if the id carries no `state_` marker.
    pub fn from_element_id(id: &str) -> Option<Self> {
        let marker = id.find("state_")?;
        let tags = id[marker + "state_".len()..]
            .split('_')
            .filter(|part| !part.is_empty())
            .map(StateId::from)
            .collect();
        Some(Self::new(id, tags))
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_state_dependent(&self) -> bool {
        !self.tags.is_empty()
    }

    pub fn is_tagged(&self, state: &StateId) -> bool {
        self.tags.contains(state)
    }
}

impl From<&PanelConfig> for Panel {
    fn from(config: &PanelConfig) -> Self {
        if config.states.is_empty() {
            if let Some(panel) = Panel::from_element_id(&config.id) {
                return panel;
            }
        }
        Panel::new(config.id.clone(), config.states.clone())
    }
}

/// Keeps panel visibility consistent with the active system state
pub struct StateEngine {
    panels: Vec<Panel>,
    index: HashMap<String, usize>,
    default_state: StateId,
    active_state: StateId,
}

impl StateEngine {
    pub fn new(panels: Vec<Panel>, default_state: StateId) -> Self {
        let index = panels
            .iter()
            .enumerate()
            .map(|(idx, panel)| (panel.id.clone(), idx))
            .collect();
        Self {
            panels,
            index,
            active_state: default_state.clone(),
            default_state,
        }
    }

    /// Enter the default state without waiting for a `systemState` message
    pub fn initialize(&mut self) {
        let state = self.default_state.clone();
        log::debug!("Initializing panels for default state {}", state);
        self.set_active_state(state);
    }

    /// Make visible exactly the state-dependent panels tagged with `state`
    ///
    /// Returns the number of panels now visible for that state. A state matching no
    /// panel hides all of them.
    pub fn set_active_state(&mut self, state: StateId) -> usize {
        let mut shown = 0;
        for panel in self.panels.iter_mut().filter(|p| p.is_state_dependent()) {
            panel.visible = panel.is_tagged(&state);
            if panel.visible {
                shown += 1;
            }
        }
        if shown == 0 {
            log::debug!("System state {} has no panels, all state panels hidden", state);
        } else {
            log::debug!("System state {} active, {} panel(s) shown", state, shown);
        }
        self.active_state = state;
        shown
    }

    /// Show or hide an untagged panel
    ///
    /// Returns `false` if the panel does not exist or is state-dependent (those follow
    /// the active state only).
    pub fn set_panel_visible(&mut self, id: &str, visible: bool) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let panel = &mut self.panels[idx];
        if panel.is_state_dependent() {
            log::warn!("Panel '{}' follows the system state and cannot be toggled", id);
            return false;
        }
        panel.visible = visible;
        true
    }

    pub fn active_state(&self) -> &StateId {
        &self.active_state
    }

    pub fn default_state(&self) -> &StateId {
        &self.default_state
    }

    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.index.get(id).map(|&idx| &self.panels[idx])
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.panel(id).map(Panel::is_visible)
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn visible_panels(&self) -> Vec<&str> {
        self.panels
            .iter()
            .filter(|p| p.visible)
            .map(|p| p.id.as_str())
            .collect()
    }
}
