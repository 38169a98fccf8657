//! Log and alert presentation
//!
//! Log records from the controller arrive as `{level, message}`. Each one becomes
//! exactly one visual alert and exactly one audio cue; repeated messages are not
//! coalesced.

use crate::config::AlertConfig;
use crate::types::Timestamp;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Severity of a controller log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Map a wire level to a severity; anything but `ERROR`/`WARNING` is info
    pub fn from_level(level: &str) -> Self {
        match level {
            "ERROR" => Severity::Error,
            "WARNING" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Visual style of an alert banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    Error,
    Warning,
    Success,
}

/// Sound played alongside an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AudioCue {
    Error,
    Warning,
    Info,
}

/// One raised alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub severity: Severity,
    pub kind: AlertKind,
    pub message: String,
    /// `None` means the alert stays until dismissed
    pub timeout: Option<Duration>,
    pub raised_at: Timestamp,
}

/// Receiver of alerts and audio cues (the banner and sound layer)
pub trait Notifier {
    fn show_alert(&mut self, alert: &Alert);
    fn play_cue(&mut self, cue: AudioCue);
}

/// Notifier that keeps everything it was given, in order
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    pub alerts: Vec<Alert>,
    pub cues: Vec<AudioCue>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
        self.cues.clear();
    }
}

impl Notifier for NotificationLog {
    fn show_alert(&mut self, alert: &Alert) {
        self.alerts.push(alert.clone());
    }

    fn play_cue(&mut self, cue: AudioCue) {
        self.cues.push(cue);
    }
}

/// Maps severities to alert style, timeout and sound
#[derive(Debug, Clone, Copy)]
pub struct AlertPresenter {
    warning_timeout: Duration,
    info_timeout: Duration,
}

impl AlertPresenter {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            warning_timeout: config.warning_timeout(),
            info_timeout: config.info_timeout(),
        }
    }

    /// Style, timeout and cue for a severity
    pub fn style(&self, severity: Severity) -> (AlertKind, Option<Duration>, AudioCue) {
        match severity {
            Severity::Error => (AlertKind::Error, None, AudioCue::Error),
            Severity::Warning => (AlertKind::Warning, Some(self.warning_timeout), AudioCue::Warning),
            Severity::Info => (AlertKind::Success, Some(self.info_timeout), AudioCue::Info),
        }
    }

    /// Raise one alert and one cue for a log record
    pub fn present(&self, level: &str, message: &str, notifier: &mut dyn Notifier) -> Alert {
        let severity = Severity::from_level(level);
        let (kind, timeout, cue) = self.style(severity);
        let alert = Alert {
            severity,
            kind,
            message: message.to_string(),
            timeout,
            raised_at: Utc::now(),
        };

        match severity {
            Severity::Error => log::error!("Controller: {}", message),
            Severity::Warning => log::warn!("Controller: {}", message),
            Severity::Info => log::info!("Controller: {}", message),
        }

        notifier.show_alert(&alert);
        notifier.play_cue(cue);
        alert
    }
}

impl Default for AlertPresenter {
    fn default() -> Self {
        Self::new(&AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_level() {
        assert_eq!(Severity::from_level("ERROR"), Severity::Error);
        assert_eq!(Severity::from_level("WARNING"), Severity::Warning);
        assert_eq!(Severity::from_level("INFO"), Severity::Info);
        assert_eq!(Severity::from_level("DEBUG"), Severity::Info);
        assert_eq!(Severity::from_level(""), Severity::Info);
    }

    #[test]
    fn test_style_table() {
        let presenter = AlertPresenter::default();
        assert_eq!(presenter.style(Severity::Error), (AlertKind::Error, None, AudioCue::Error));
        assert_eq!(
            presenter.style(Severity::Warning),
            (AlertKind::Warning, Some(Duration::from_secs(60)), AudioCue::Warning)
        );
        assert_eq!(
            presenter.style(Severity::Info),
            (AlertKind::Success, Some(Duration::from_secs(30)), AudioCue::Info)
        );
    }

    #[test]
    fn test_present_fires_once_each() {
        let presenter = AlertPresenter::default();
        let mut log = NotificationLog::new();

        presenter.present("WARNING", "Coolant flow low", &mut log);
        presenter.present("WARNING", "Coolant flow low", &mut log);

        assert_eq!(log.alerts.len(), 2);
        assert_eq!(log.cues, vec![AudioCue::Warning, AudioCue::Warning]);
        assert_eq!(log.alerts[0].message, "Coolant flow low");
    }
}
