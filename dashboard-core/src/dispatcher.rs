//! Telemetry dispatcher
//!
//! Routes every entry of a message batch to exactly one handler, chosen by the
//! channel kind assigned in the binding registry:
//! 1. Gauge → set the gauge value
//! 2. `limits` → set limits of every named, registered gauge
//! 3. Bitfield → decode bits into annunciator lights
//! 4. `systemState` → switch the active panel group
//! 5. `logMessage` → raise an alert and play its cue
//! 6. Anything else → generic text/meter targets (plus the cruise-control panel toggle)
//!
//! A bad entry never stops the batch: it is logged, counted and skipped.

use crate::alerts::{AlertPresenter, Notifier};
use crate::bitfield::{Annunciators, BitfieldDecoder};
use crate::config::DashboardConfig;
use crate::panels::{Panel, StateEngine, StateId};
use crate::registry::{BindingRegistry, ChannelKind, CRUISE_CONTROL_CHANNEL};
use crate::types::{DashboardError, MessageBatch, Result, TelemetryValue};
use serde::Serialize;

/// Outcome counters for one or more dispatched batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Entries that reached a handler and were applied
    pub applied: usize,
    /// Entries for channels nothing is bound to
    pub dropped: usize,
    /// Entries whose value had the wrong shape for their channel
    pub malformed: usize,
}

impl DispatchStats {
    pub fn total(&self) -> usize {
        self.applied + self.dropped + self.malformed
    }

    pub fn merge(&mut self, other: DispatchStats) {
        self.applied += other.applied;
        self.dropped += other.dropped;
        self.malformed += other.malformed;
    }
}

/// What happened to a single entry
enum EntryOutcome {
    Applied,
    Dropped,
}

/// Owns all UI state and applies message batches to it
pub struct TelemetryDispatcher {
    registry: BindingRegistry,
    states: StateEngine,
    decoder: BitfieldDecoder,
    annunciators: Annunciators,
    presenter: AlertPresenter,
    cruise_panel: String,
    alerts_raised: usize,
}

impl TelemetryDispatcher {
    /// Build registry, panels and decoder from the configuration, then enter the
    /// default state
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        config.validate()?;

        let panels: Vec<Panel> = config.panels.iter().map(Panel::from).collect();
        let mut states = StateEngine::new(panels, config.default_state.clone());
        states.initialize();

        Ok(Self {
            registry: BindingRegistry::from_config(config),
            states,
            decoder: BitfieldDecoder::new(config.bitfields.clone(), config.default_bitfield_width),
            annunciators: Annunciators::from_layouts(&config.bitfields),
            presenter: AlertPresenter::new(&config.alerts),
            cruise_panel: config.cruise_panel.clone(),
            alerts_raised: 0,
        })
    }

    /// Apply every entry of a batch, in order, before returning
    pub fn dispatch(&mut self, batch: &MessageBatch, notifier: &mut dyn Notifier) -> DispatchStats {
        let mut stats = DispatchStats::default();

        for (name, value) in batch.iter() {
            match self.apply_entry(name, value, notifier) {
                Ok(EntryOutcome::Applied) => stats.applied += 1,
                Ok(EntryOutcome::Dropped) => {
                    log::trace!("No binding for channel '{}', dropped", name);
                    stats.dropped += 1;
                }
                Err(e) => {
                    log::warn!("Skipping entry: {}", e);
                    stats.malformed += 1;
                }
            }
        }

        log::trace!(
            "Batch dispatched: {} applied, {} dropped, {} malformed",
            stats.applied,
            stats.dropped,
            stats.malformed
        );
        stats
    }

    fn apply_entry(
        &mut self,
        name: &str,
        value: &TelemetryValue,
        notifier: &mut dyn Notifier,
    ) -> Result<EntryOutcome> {
        match self.registry.kind_of(name) {
            ChannelKind::Gauge => self.apply_gauge(name, value),
            ChannelKind::Limits => self.apply_limits(name, value),
            ChannelKind::Bitfield => self.apply_bitfield(name, value),
            ChannelKind::SystemState => self.apply_system_state(name, value),
            ChannelKind::LogMessage => self.apply_log_message(name, value, notifier),
            ChannelKind::Generic => Ok(self.apply_generic(name, value)),
        }
    }

    fn apply_gauge(&mut self, name: &str, value: &TelemetryValue) -> Result<EntryOutcome> {
        let number = value
            .as_f64()
            .ok_or_else(|| DashboardError::malformed(name, format!("expected a number, got '{}'", value)))?;
        match self.registry.gauge_mut(name) {
            Some(gauge) => {
                gauge.set_value(number);
                Ok(EntryOutcome::Applied)
            }
            None => Ok(EntryOutcome::Dropped),
        }
    }

    fn apply_limits(&mut self, name: &str, value: &TelemetryValue) -> Result<EntryOutcome> {
        let entries = value
            .as_map()
            .ok_or_else(|| DashboardError::malformed(name, "expected a mapping of gauge limits"))?;

        for (gauge_name, range) in entries {
            let Some(gauge) = self.registry.gauge_mut(gauge_name) else {
                log::trace!("Limits for unregistered gauge '{}' ignored", gauge_name);
                continue;
            };
            let min = range.get("min").and_then(TelemetryValue::as_f64);
            let max = range.get("max").and_then(TelemetryValue::as_f64);
            match (min, max) {
                (Some(min), Some(max)) => gauge.set_limits(min, max),
                _ => log::warn!("Malformed limits for gauge '{}': {}", gauge_name, range),
            }
        }
        Ok(EntryOutcome::Applied)
    }

    fn apply_bitfield(&mut self, name: &str, value: &TelemetryValue) -> Result<EntryOutcome> {
        let bits = value.as_u64().ok_or_else(|| {
            DashboardError::malformed(name, format!("expected a non-negative integer, got '{}'", value))
        })?;
        let states = self.decoder.decode(name, bits);
        let changed = self.annunciators.apply(states);
        if changed > 0 {
            log::debug!("Bitfield '{}' = {:#x}, {} indicator(s) changed", name, bits, changed);
        }
        Ok(EntryOutcome::Applied)
    }

    fn apply_system_state(&mut self, name: &str, value: &TelemetryValue) -> Result<EntryOutcome> {
        let state = StateId::from_value(value)
            .ok_or_else(|| DashboardError::malformed(name, format!("not a state identifier: '{}'", value)))?;
        self.states.set_active_state(state);
        Ok(EntryOutcome::Applied)
    }

    fn apply_log_message(
        &mut self,
        name: &str,
        value: &TelemetryValue,
        notifier: &mut dyn Notifier,
    ) -> Result<EntryOutcome> {
        if value.as_map().is_none() {
            return Err(DashboardError::malformed(name, "expected {level, message}"));
        }
        let level = value.get("level").and_then(TelemetryValue::as_str).unwrap_or("");
        let message = match value.get("message") {
            Some(message) => message.to_string(),
            None => return Err(DashboardError::malformed(name, "log record without message")),
        };
        self.presenter.present(level, &message, notifier);
        self.alerts_raised += 1;
        Ok(EntryOutcome::Applied)
    }

    fn apply_generic(&mut self, name: &str, value: &TelemetryValue) -> EntryOutcome {
        let mut applied = self.registry.set_generic(name, value) > 0;

        if name == CRUISE_CONTROL_CHANNEL {
            let cruise_panel = self.cruise_panel.as_str();
            if self.states.set_panel_visible(cruise_panel, value.as_bool()) {
                applied = true;
            } else {
                log::debug!("Cruise-control panel '{}' not available", cruise_panel);
            }
        }

        if applied {
            EntryOutcome::Applied
        } else {
            EntryOutcome::Dropped
        }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn states(&self) -> &StateEngine {
        &self.states
    }

    pub fn decoder(&self) -> &BitfieldDecoder {
        &self.decoder
    }

    pub fn annunciators(&self) -> &Annunciators {
        &self.annunciators
    }

    pub fn alerts_raised(&self) -> usize {
        self.alerts_raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AudioCue, NotificationLog};
    use crate::bitfield::BitfieldLayout;
    use crate::config::GaugeConfig;

    fn dispatcher() -> TelemetryDispatcher {
        let config = DashboardConfig::new()
            .with_gauge(GaugeConfig::new("throttle"))
            .with_gauge(GaugeConfig::new("speedActual"))
            .with_value_target("soc")
            .with_value_target("enableCruiseControl")
            .with_panel("state_0_", vec![])
            .with_panel("state_1_", vec![])
            .with_panel("cruiseControl", vec![])
            .with_bitfield(BitfieldLayout::new("bitfieldMotor", 4).with_indicators(["ready", "running"]));
        TelemetryDispatcher::new(&config).unwrap()
    }

    #[test]
    fn test_gauge_value() {
        let mut dispatcher = dispatcher();
        let mut log = NotificationLog::new();
        let batch = MessageBatch::new().with("throttle", 42.0).with("soc", 80.0);

        let stats = dispatcher.dispatch(&batch, &mut log);
        assert_eq!(stats.applied, 2);
        assert_eq!(dispatcher.registry().gauge("throttle").unwrap().value(), Some(42.0));
        assert_eq!(dispatcher.registry().gauge("speedActual").unwrap().value(), None);
    }

    #[test]
    fn test_malformed_entry_does_not_stop_batch() {
        let mut dispatcher = dispatcher();
        let mut log = NotificationLog::new();
        let batch = MessageBatch::new()
            .with("limits", 5.0)
            .with("throttle", "full")
            .with("bitfieldMotor", -3.0)
            .with("systemState", TelemetryValue::Null)
            .with("logMessage", "oops")
            .with("speedActual", 900.0);

        let stats = dispatcher.dispatch(&batch, &mut log);
        assert_eq!(stats.malformed, 5);
        assert_eq!(stats.applied, 1);
        assert_eq!(dispatcher.registry().gauge("speedActual").unwrap().value(), Some(900.0));
        assert!(log.alerts.is_empty());
    }

    #[test]
    fn test_unknown_channel_dropped() {
        let mut dispatcher = dispatcher();
        let mut log = NotificationLog::new();
        let batch = MessageBatch::new().with("mysteryValue", 1.0);

        let stats = dispatcher.dispatch(&batch, &mut log);
        assert_eq!(stats, DispatchStats { applied: 0, dropped: 1, malformed: 0 });
    }

    #[test]
    fn test_log_message_level_default() {
        let mut dispatcher = dispatcher();
        let mut log = NotificationLog::new();
        let record = TelemetryValue::Map(vec![
            ("level".to_string(), TelemetryValue::from("DEBUG")),
            ("message".to_string(), TelemetryValue::from("Precharge complete")),
        ]);
        dispatcher.dispatch(&MessageBatch::new().with("logMessage", record), &mut log);

        assert_eq!(log.cues, vec![AudioCue::Info]);
        assert_eq!(log.alerts[0].message, "Precharge complete");
        assert_eq!(dispatcher.alerts_raised(), 1);
    }

    #[test]
    fn test_cruise_control_toggle_and_text() {
        let mut dispatcher = dispatcher();
        let mut log = NotificationLog::new();

        dispatcher.dispatch(&MessageBatch::new().with("enableCruiseControl", false), &mut log);
        assert_eq!(dispatcher.states().is_visible("cruiseControl"), Some(false));
        assert_eq!(
            dispatcher.registry().target("enableCruiseControl").unwrap().value(),
            Some(&TelemetryValue::Bool(false))
        );

        dispatcher.dispatch(&MessageBatch::new().with("enableCruiseControl", true), &mut log);
        assert_eq!(dispatcher.states().is_visible("cruiseControl"), Some(true));
    }

    #[test]
    fn test_bitfield_updates_annunciators() {
        let mut dispatcher = dispatcher();
        let mut log = NotificationLog::new();
        dispatcher.dispatch(&MessageBatch::new().with("bitfieldMotor", 0b1001 as f64), &mut log);

        let lights = dispatcher.annunciators();
        assert_eq!(lights.get("ready"), Some(true));
        assert_eq!(lights.get("running"), Some(false));
        assert_eq!(lights.get("bitfieldMotor.3"), Some(true));
    }

    #[test]
    fn test_stats_merge() {
        let mut total = DispatchStats::default();
        total.merge(DispatchStats { applied: 2, dropped: 1, malformed: 0 });
        total.merge(DispatchStats { applied: 1, dropped: 0, malformed: 3 });
        assert_eq!(total.total(), 7);
    }
}
