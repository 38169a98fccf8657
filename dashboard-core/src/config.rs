//! Dashboard configuration types
//!
//! This module describes everything the dashboard needs to know at activation time:
//! which gauges and value targets exist, which panels belong to which system state,
//! and how packed bitfields map onto annunciator lights. The binding registry and the
//! panel set are built from it once and never change afterwards.

use crate::bitfield::BitfieldLayout;
use crate::panels::{Panel, StateId};
use crate::types::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Configuration for one dashboard session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Gauges (dials) by channel name
    #[serde(default)]
    pub gauges: Vec<GaugeConfig>,

    /// Generic value targets (text nodes and `<name>Meter` meters)
    #[serde(default)]
    pub value_targets: Vec<String>,

    /// State-dependent panels
    #[serde(default)]
    pub panels: Vec<PanelConfig>,

    /// Panel toggled by the `enableCruiseControl` channel
    #[serde(default = "default_cruise_panel")]
    pub cruise_panel: String,

    /// State shown before the first `systemState` message arrives
    #[serde(default = "default_state")]
    pub default_state: StateId,

    /// Bit-to-indicator layouts for packed annunciator channels
    #[serde(default)]
    pub bitfields: Vec<BitfieldLayout>,

    /// Width used for bitfield channels without a configured layout
    #[serde(default = "default_bitfield_width")]
    pub default_bitfield_width: u8,

    /// Alert display timeouts
    #[serde(default)]
    pub alerts: AlertConfig,
}

fn default_cruise_panel() -> String {
    "cruiseControl".to_string()
}

fn default_state() -> StateId {
    StateId::from(0)
}

fn default_bitfield_width() -> u8 {
    32
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            gauges: Vec::new(),
            value_targets: Vec::new(),
            panels: Vec::new(),
            cruise_panel: default_cruise_panel(),
            default_state: default_state(),
            bitfields: Vec::new(),
            default_bitfield_width: default_bitfield_width(),
            alerts: AlertConfig::default(),
        }
    }
}

/// A gauge bound to one telemetry channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaugeConfig {
    pub name: String,
    /// Initial lower limit (optional)
    #[serde(default)]
    pub min: Option<f64>,
    /// Initial upper limit (optional)
    #[serde(default)]
    pub max: Option<f64>,
}

impl GaugeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: None,
            max: None,
        }
    }

    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// A panel and the system states it belongs to
///
/// Either `states` is given explicitly, or it is parsed from an element id of the
/// form `state_<a>_<b>_` (an empty list means the panel is not state-dependent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelConfig {
    pub id: String,
    #[serde(default)]
    pub states: Vec<StateId>,
}

impl PanelConfig {
    pub fn new(id: impl Into<String>, states: Vec<StateId>) -> Self {
        Self {
            id: id.into(),
            states,
        }
    }
}

/// Display timeouts in seconds for non-error alerts (errors stay until dismissed)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    #[serde(default = "default_warning_timeout")]
    pub warning_timeout_secs: u64,
    #[serde(default = "default_info_timeout")]
    pub info_timeout_secs: u64,
}

fn default_warning_timeout() -> u64 {
    60
}

fn default_info_timeout() -> u64 {
    30
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_timeout_secs: default_warning_timeout(),
            info_timeout_secs: default_info_timeout(),
        }
    }
}

impl AlertConfig {
    pub fn warning_timeout(&self) -> Duration {
        Duration::from_secs(self.warning_timeout_secs)
    }

    pub fn info_timeout(&self) -> Duration {
        Duration::from_secs(self.info_timeout_secs)
    }
}

impl DashboardConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a gauge
    pub fn with_gauge(mut self, gauge: GaugeConfig) -> Self {
        self.gauges.push(gauge);
        self
    }

    /// Builder method: add a generic value target
    pub fn with_value_target(mut self, name: impl Into<String>) -> Self {
        self.value_targets.push(name.into());
        self
    }

    /// Builder method: add a panel with explicit state tags
    pub fn with_panel(mut self, id: impl Into<String>, states: Vec<StateId>) -> Self {
        self.panels.push(PanelConfig::new(id, states));
        self
    }

    /// Builder method: add a bitfield layout
    pub fn with_bitfield(mut self, layout: BitfieldLayout) -> Self {
        self.bitfields.push(layout);
        self
    }

    /// Builder method: set the default state
    pub fn with_default_state(mut self, state: impl Into<StateId>) -> Self {
        self.default_state = state.into();
        self
    }

    /// Builder method: set the cruise-control panel id
    pub fn with_cruise_panel(mut self, id: impl Into<String>) -> Self {
        self.cruise_panel = id.into();
        self
    }

    /// Check the configuration for contradictions the registry cannot resolve
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for gauge in &self.gauges {
            if gauge.name.is_empty() {
                return Err(DashboardError::InvalidConfig("gauge with empty name".into()));
            }
            if !seen.insert(gauge.name.as_str()) {
                return Err(DashboardError::InvalidConfig(format!(
                    "gauge '{}' declared twice",
                    gauge.name
                )));
            }
            if let (Some(min), Some(max)) = (gauge.min, gauge.max) {
                if min > max {
                    return Err(DashboardError::InvalidConfig(format!(
                        "gauge '{}' has min {} above max {}",
                        gauge.name, min, max
                    )));
                }
            }
        }

        let mut panel_ids = HashSet::new();
        for panel in &self.panels {
            if !panel_ids.insert(panel.id.as_str()) {
                return Err(DashboardError::InvalidConfig(format!(
                    "panel '{}' declared twice",
                    panel.id
                )));
            }
            // enableCruiseControl toggles this panel directly, so no state may own it
            if panel.id == self.cruise_panel && Panel::from(panel).is_state_dependent() {
                return Err(DashboardError::InvalidConfig(format!(
                    "cruise panel '{}' must not be tied to a system state",
                    panel.id
                )));
            }
        }

        if !(1..=64).contains(&self.default_bitfield_width) {
            return Err(DashboardError::InvalidConfig(format!(
                "default bitfield width {} outside 1..=64",
                self.default_bitfield_width
            )));
        }
        for layout in &self.bitfields {
            layout.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_config_builder() {
        let config = DashboardConfig::new()
            .with_gauge(GaugeConfig::new("throttle").with_limits(0.0, 100.0))
            .with_value_target("soc")
            .with_panel("state_1_", vec![StateId::from(1)])
            .with_bitfield(BitfieldLayout::new("bitfieldIO", 3))
            .with_default_state(0);

        assert_eq!(config.gauges.len(), 1);
        assert_eq!(config.gauges[0].max, Some(100.0));
        assert_eq!(config.value_targets, vec!["soc".to_string()]);
        assert_eq!(config.cruise_panel, "cruiseControl");
        assert_eq!(config.default_state, StateId::from(0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_bitfield_width, 32);
        assert_eq!(config.alerts.warning_timeout_secs, 60);
        assert_eq!(config.alerts.info_timeout_secs, 30);
        assert_eq!(config.default_state, StateId::from(0));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_widths() {
        let config = DashboardConfig::new()
            .with_gauge(GaugeConfig::new("speedActual"))
            .with_gauge(GaugeConfig::new("speedActual"));
        assert!(config.validate().is_err());

        let config = DashboardConfig::new().with_gauge(GaugeConfig::new("dcVoltage").with_limits(10.0, 5.0));
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::new();
        config.default_bitfield_width = 0;
        assert!(config.validate().is_err());

        let config = DashboardConfig::new().with_bitfield(BitfieldLayout::new("bitfieldBms", 65));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_state_bound_cruise_panel() {
        let config = DashboardConfig::new().with_panel("cruiseControl", vec![StateId::from(1)]);
        assert!(matches!(config.validate(), Err(DashboardError::InvalidConfig(_))));

        let config = DashboardConfig::new()
            .with_cruise_panel("cruise_state_1_")
            .with_panel("cruise_state_1_", vec![]);
        assert!(config.validate().is_err());

        let config = DashboardConfig::new().with_panel("cruiseControl", vec![]);
        assert!(config.validate().is_ok());
    }
}
