//! Binding registry
//!
//! Maps channel names to the targets that render them. The registry is built once
//! from the [`DashboardConfig`] and its channel-to-target mapping never changes;
//! only the values held by the targets do.

use crate::config::DashboardConfig;
use crate::types::TelemetryValue;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Reserved channel carrying gauge limit updates
pub const LIMITS_CHANNEL: &str = "limits";
/// Reserved channel carrying the controller operating state
pub const SYSTEM_STATE_CHANNEL: &str = "systemState";
/// Reserved channel carrying log records
pub const LOG_MESSAGE_CHANNEL: &str = "logMessage";
/// Channel whose flag also toggles the cruise-control panel
pub const CRUISE_CONTROL_CHANNEL: &str = "enableCruiseControl";
/// Suffix of the meter target that mirrors a generic channel
pub const METER_SUFFIX: &str = "Meter";

/// How an incoming channel is handled, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Gauge,
    Limits,
    Bitfield,
    SystemState,
    LogMessage,
    Generic,
}

impl ChannelKind {
    /// Classify a channel name by the fixed rules
    ///
    /// A registered gauge wins over every reserved name.
    pub fn classify(name: &str, is_gauge: bool) -> Self {
        if is_gauge {
            ChannelKind::Gauge
        } else if name == LIMITS_CHANNEL {
            ChannelKind::Limits
        } else if name.to_ascii_lowercase().contains("bitfield") {
            ChannelKind::Bitfield
        } else if name == SYSTEM_STATE_CHANNEL {
            ChannelKind::SystemState
        } else if name == LOG_MESSAGE_CHANNEL {
            ChannelKind::LogMessage
        } else {
            ChannelKind::Generic
        }
    }
}

/// A dial bound to one telemetry channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    pub name: String,
    value: Option<f64>,
    limits: Option<(f64, f64)>,
}

impl Gauge {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            limits: None,
        }
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = Some(value);
    }

    pub fn set_limits(&mut self, min: f64, max: f64) {
        self.limits = Some((min, max));
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn limits(&self) -> Option<(f64, f64)> {
        self.limits
    }
}

/// A generic text or meter target holding the last value received
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTarget {
    pub name: String,
    value: Option<TelemetryValue>,
}

impl ValueTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn set_value(&mut self, value: TelemetryValue) {
        self.value = Some(value);
    }

    pub fn value(&self) -> Option<&TelemetryValue> {
        self.value.as_ref()
    }
}

/// Channel name → render target mapping
pub struct BindingRegistry {
    kinds: HashMap<String, ChannelKind>,
    gauges: BTreeMap<String, Gauge>,
    targets: BTreeMap<String, ValueTarget>,
}

impl BindingRegistry {
    /// Build the registry from the configured gauges, value targets and bitfields
    pub fn from_config(config: &DashboardConfig) -> Self {
        let mut gauges = BTreeMap::new();
        for gauge_config in &config.gauges {
            let mut gauge = Gauge::new(gauge_config.name.clone());
            if let (Some(min), Some(max)) = (gauge_config.min, gauge_config.max) {
                gauge.set_limits(min, max);
            }
            gauges.insert(gauge_config.name.clone(), gauge);
        }

        let targets: BTreeMap<String, ValueTarget> = config
            .value_targets
            .iter()
            .map(|name| (name.clone(), ValueTarget::new(name.clone())))
            .collect();

        // Every channel we know about gets its kind assigned up front
        let mut kinds = HashMap::new();
        let reserved = [LIMITS_CHANNEL, SYSTEM_STATE_CHANNEL, LOG_MESSAGE_CHANNEL, CRUISE_CONTROL_CHANNEL];
        let known = reserved
            .iter()
            .map(|name| name.to_string())
            .chain(gauges.keys().cloned())
            .chain(targets.keys().map(|name| {
                name.strip_suffix(METER_SUFFIX).unwrap_or(name).to_string()
            }))
            .chain(config.bitfields.iter().map(|layout| layout.channel.clone()));
        for name in known {
            let kind = if config.bitfields.iter().any(|layout| layout.channel == name) {
                // A configured layout makes it a bitfield whatever its name
                if gauges.contains_key(&name) {
                    ChannelKind::Gauge
                } else {
                    ChannelKind::Bitfield
                }
            } else {
                ChannelKind::classify(&name, gauges.contains_key(&name))
            };
            kinds.insert(name, kind);
        }

        log::info!(
            "Binding registry built: {} gauge(s), {} value target(s), {} known channel(s)",
            gauges.len(),
            targets.len(),
            kinds.len()
        );

        Self {
            kinds,
            gauges,
            targets,
        }
    }

    /// Kind of a channel; names outside the registry are classified by name alone
    pub fn kind_of(&self, name: &str) -> ChannelKind {
        match self.kinds.get(name) {
            Some(kind) => *kind,
            None => ChannelKind::classify(name, false),
        }
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn gauge(&self, name: &str) -> Option<&Gauge> {
        self.gauges.get(name)
    }

    pub fn gauge_mut(&mut self, name: &str) -> Option<&mut Gauge> {
        self.gauges.get_mut(name)
    }

    pub fn gauges(&self) -> impl Iterator<Item = &Gauge> {
        self.gauges.values()
    }

    pub fn target(&self, name: &str) -> Option<&ValueTarget> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &ValueTarget> {
        self.targets.values()
    }

    /// Write a generic value to the text target `name` and the meter `name + "Meter"`
    ///
    /// Returns the number of targets updated (0 if neither exists).
    pub fn set_generic(&mut self, name: &str, value: &TelemetryValue) -> usize {
        let mut updated = 0;
        let meter = format!("{}{}", name, METER_SUFFIX);
        for target_name in [meter.as_str(), name] {
            if let Some(target) = self.targets.get_mut(target_name) {
                target.set_value(value.clone());
                updated += 1;
            }
        }
        updated
    }
}
