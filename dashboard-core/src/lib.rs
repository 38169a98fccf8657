//! Vehicle Controller Dashboard Engine
//!
//! Reflects a live stream of named telemetry values from a vehicle control unit into
//! dashboard state (gauges, limit ranges, annunciator lights, text values, state
//! panels, alert banners) and sends operator commands back over the same channel.
//!
//! # Architecture
//!
//! - [`registry`]: channel name → render target, built once at activation
//! - [`dispatcher`]: routes each batch entry to exactly one handler
//! - [`panels`]: keeps panel visibility consistent with the active system state
//! - [`bitfield`]: unpacks annunciator bitfields using injected layouts
//! - [`alerts`]: turns controller log records into alerts and audio cues
//! - [`command`]: typed operator commands and the outbound channel
//! - [`dashboard`]: the controller owning all of the above plus the channel handle
//!
//! The library does NOT own the transport: connection handling, retries and
//! start/stop live behind the [`ChannelHandle`] trait.
//!
//! # Example Usage
//!
//! ```no_run
//! use dashboard_core::{
//!     ChannelHandle, Command, Dashboard, DashboardConfig, GaugeConfig, NotificationLog, Result,
//! };
//!
//! struct Stdout;
//!
//! impl ChannelHandle for Stdout {
//!     fn start(&mut self) -> Result<()> { Ok(()) }
//!     fn stop(&mut self) -> Result<()> { Ok(()) }
//!     fn post_message(&mut self, message: &str) -> Result<()> {
//!         println!("-> {}", message);
//!         Ok(())
//!     }
//! }
//!
//! let config = DashboardConfig::new()
//!     .with_gauge(GaugeConfig::new("speedActual"))
//!     .with_panel("state_1_", vec![]);
//!
//! let mut dashboard = Dashboard::new(&config, Stdout, NotificationLog::new()).unwrap();
//! dashboard.activate().unwrap();
//! dashboard.handle_text(r#"{"speedActual": 1500, "systemState": 1}"#).unwrap();
//! dashboard.send(&Command::CruiseAdjust(5)).unwrap();
//! ```

// Public modules
pub mod alerts;
pub mod bitfield;
pub mod command;
pub mod config;
pub mod dashboard;
pub mod dispatcher;
pub mod panels;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use alerts::{Alert, AlertKind, AlertPresenter, AudioCue, NotificationLog, Notifier, Severity};
pub use bitfield::{Annunciators, BitfieldDecoder, BitfieldLayout, IndicatorId};
pub use command::{ChannelHandle, ChargeOptions, Command, CommandChannel, CruiseButton, CruiseSetup};
pub use config::{AlertConfig, DashboardConfig, GaugeConfig, PanelConfig};
pub use dashboard::{Dashboard, DashboardSnapshot, GaugeSnapshot};
pub use dispatcher::{DispatchStats, TelemetryDispatcher};
pub use panels::{Panel, StateEngine, StateId};
pub use registry::{BindingRegistry, ChannelKind, Gauge, ValueTarget};
pub use types::{DashboardError, MessageBatch, Result, TelemetryValue, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty configuration builds a usable dispatcher
        let dispatcher = TelemetryDispatcher::new(&DashboardConfig::new()).unwrap();
        assert_eq!(dispatcher.registry().gauges().count(), 0);
        assert_eq!(dispatcher.states().active_state(), &StateId::from(0));
    }
}
