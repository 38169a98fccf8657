//! Dashboard controller
//!
//! Ties the dispatcher, the outbound command path and the notifier to one explicit
//! channel handle. All methods run on the single UI thread; a batch handed to
//! [`Dashboard::handle_batch`] is applied completely before the call returns.

use crate::alerts::Notifier;
use crate::command::{ChannelHandle, Command, CommandChannel};
use crate::config::DashboardConfig;
use crate::dispatcher::{DispatchStats, TelemetryDispatcher};
use crate::types::{MessageBatch, Result, TelemetryValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time view of everything the dashboard shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub active_state: String,
    pub gauges: BTreeMap<String, GaugeSnapshot>,
    pub values: BTreeMap<String, TelemetryValue>,
    pub indicators: BTreeMap<String, bool>,
    pub visible_panels: Vec<String>,
    pub alerts_raised: usize,
    pub stats: DispatchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeSnapshot {
    pub value: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// The dashboard session: UI state plus the channel it is fed from
pub struct Dashboard<H: ChannelHandle, N: Notifier> {
    dispatcher: TelemetryDispatcher,
    channel: H,
    notifier: N,
    stats: DispatchStats,
    active: bool,
}

impl<H: ChannelHandle, N: Notifier> Dashboard<H, N> {
    /// Build the dashboard; panels are already in the default state afterwards
    pub fn new(config: &DashboardConfig, channel: H, notifier: N) -> Result<Self> {
        let dispatcher = TelemetryDispatcher::new(config)?;
        Ok(Self {
            dispatcher,
            channel,
            notifier,
            stats: DispatchStats::default(),
            active: false,
        })
    }

    /// Start the message channel
    pub fn activate(&mut self) -> Result<()> {
        if !self.active {
            log::info!("Activating dashboard");
            self.channel.start()?;
            self.active = true;
        }
        Ok(())
    }

    /// Stop the message channel; UI state is left as it is
    pub fn deactivate(&mut self) -> Result<()> {
        if self.active {
            log::info!("Deactivating dashboard");
            self.channel.stop()?;
            self.active = false;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply one message batch
    pub fn handle_batch(&mut self, batch: &MessageBatch) -> DispatchStats {
        let stats = self.dispatcher.dispatch(batch, &mut self.notifier);
        self.stats.merge(stats);
        stats
    }

    /// Parse and apply one JSON message from the channel
    pub fn handle_text(&mut self, text: &str) -> Result<DispatchStats> {
        let batch = MessageBatch::from_json(text)?;
        Ok(self.handle_batch(&batch))
    }

    /// Outbound command path over this dashboard's channel
    pub fn commands(&mut self) -> CommandChannel<'_, H> {
        CommandChannel::new(&mut self.channel)
    }

    /// Forward a command string verbatim
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.commands().send_command(command)
    }

    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.commands().send(command)
    }

    pub fn dispatcher(&self) -> &TelemetryDispatcher {
        &self.dispatcher
    }

    pub fn channel(&self) -> &H {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut H {
        &mut self.channel
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Totals over every batch handled so far
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let registry = self.dispatcher.registry();
        let states = self.dispatcher.states();

        let gauges = registry
            .gauges()
            .map(|gauge| {
                let (min, max) = match gauge.limits() {
                    Some((min, max)) => (Some(min), Some(max)),
                    None => (None, None),
                };
                (
                    gauge.name.clone(),
                    GaugeSnapshot {
                        value: gauge.value(),
                        min,
                        max,
                    },
                )
            })
            .collect();

        let values = registry
            .targets()
            .filter_map(|target| target.value().map(|v| (target.name.clone(), v.clone())))
            .collect();

        DashboardSnapshot {
            active_state: states.active_state().to_string(),
            gauges,
            values,
            indicators: self.dispatcher.annunciators().lights().clone(),
            visible_panels: states.visible_panels().into_iter().map(String::from).collect(),
            alerts_raised: self.dispatcher.alerts_raised(),
            stats: self.stats,
        }
    }
}
