//! Console output
//!
//! Prints alerts as they are raised and renders the final dashboard snapshot as
//! either a text summary or JSON.

use dashboard_core::{Alert, AlertKind, AudioCue, CruiseButton, DashboardSnapshot, Notifier};
use std::collections::HashMap;

/// Notifier that prints every alert to stdout and counts the cues it would play
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    pub alerts: usize,
    pub cues: HashMap<AudioCue, usize>,
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn show_alert(&mut self, alert: &Alert) {
        self.alerts += 1;
        if self.quiet {
            return;
        }
        let marker = match alert.kind {
            AlertKind::Error => "✗",
            AlertKind::Warning => "⚠",
            AlertKind::Success => "✓",
        };
        let timeout = match alert.timeout {
            Some(timeout) => format!("{}s", timeout.as_secs()),
            None => "until dismissed".to_string(),
        };
        println!(
            "{} [{}] {} ({}, {})",
            marker,
            alert.severity,
            alert.message,
            alert.raised_at.format("%H:%M:%S"),
            timeout
        );
    }

    fn play_cue(&mut self, cue: AudioCue) {
        *self.cues.entry(cue).or_insert(0) += 1;
    }
}

/// Render the snapshot as a text summary
pub fn render_text(snapshot: &DashboardSnapshot, sent: &[String], cruise: &[CruiseButton]) -> String {
    let mut out = String::new();
    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str("  Dashboard State\n");
    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str(&format!("System state:   {}\n", snapshot.active_state));
    out.push_str(&format!("Visible panels: {}\n", snapshot.visible_panels.join(", ")));

    if !snapshot.gauges.is_empty() {
        out.push_str("\nGauges:\n");
        for (name, gauge) in &snapshot.gauges {
            let value = gauge
                .value
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "-".to_string());
            let line = match (gauge.min, gauge.max) {
                (Some(min), Some(max)) => format!("  {:<24} {:>10}  [{} .. {}]\n", name, value, min, max),
                _ => format!("  {:<24} {:>10}\n", name, value),
            };
            out.push_str(&line);
        }
    }

    if !snapshot.values.is_empty() {
        out.push_str("\nValues:\n");
        for (name, value) in &snapshot.values {
            out.push_str(&format!("  {:<24} {}\n", name, value));
        }
    }

    let lit: Vec<&str> = snapshot
        .indicators
        .iter()
        .filter(|(_, on)| **on)
        .map(|(name, _)| name.as_str())
        .collect();
    if !snapshot.indicators.is_empty() {
        out.push_str(&format!(
            "\nIndicators: {} of {} lit{}{}\n",
            lit.len(),
            snapshot.indicators.len(),
            if lit.is_empty() { "" } else { ": " },
            lit.join(", ")
        ));
    }

    if !cruise.is_empty() {
        let labels: Vec<&str> = cruise.iter().map(|b| b.label.as_str()).collect();
        out.push_str(&format!("\nCruise buttons: {}\n", labels.join("  ")));
    }

    if !sent.is_empty() {
        out.push_str("\nCommands sent:\n");
        for command in sent {
            out.push_str(&format!("  {}\n", command));
        }
    }

    out.push_str(&format!(
        "\nEntries: {} applied, {} dropped, {} malformed; {} alert(s)\n",
        snapshot.stats.applied, snapshot.stats.dropped, snapshot.stats.malformed, snapshot.alerts_raised
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::{CruiseSetup, DispatchStats, GaugeSnapshot, TelemetryValue};
    use std::collections::BTreeMap;

    fn snapshot() -> DashboardSnapshot {
        let mut gauges = BTreeMap::new();
        gauges.insert(
            "speedActual".to_string(),
            GaugeSnapshot {
                value: Some(1500.0),
                min: Some(0.0),
                max: Some(8000.0),
            },
        );
        let mut values = BTreeMap::new();
        values.insert("soc".to_string(), TelemetryValue::Number(80.0));
        let mut indicators = BTreeMap::new();
        indicators.insert("ready".to_string(), true);
        indicators.insert("fault".to_string(), false);

        DashboardSnapshot {
            active_state: "1".to_string(),
            gauges,
            values,
            indicators,
            visible_panels: vec!["state_1_".to_string()],
            alerts_raised: 0,
            stats: DispatchStats {
                applied: 4,
                dropped: 1,
                malformed: 0,
            },
        }
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&snapshot(), &["cruise=+5".to_string()], &[]);
        assert!(text.contains("System state:   1"));
        assert!(text.contains("speedActual"));
        assert!(text.contains("[0 .. 8000]"));
        assert!(text.contains("Indicators: 1 of 2 lit: ready"));
        assert!(text.contains("  cruise=+5"));
        assert!(text.contains("4 applied, 1 dropped, 0 malformed"));
        assert!(text.ends_with("0 alert(s)\n"));
    }

    #[test]
    fn test_render_text_sections() {
        let mut snapshot = snapshot();
        snapshot.gauges.clear();
        snapshot.indicators.insert("fault".to_string(), false);
        snapshot.indicators.remove("ready");
        let buttons = CruiseSetup {
            use_rpm: false,
            speed_step: 5,
            speed_set: vec![80],
        }
        .buttons();

        let text = render_text(&snapshot, &[], &buttons);
        assert!(!text.contains("Gauges:"));
        assert!(!text.contains("Commands sent:"));
        assert!(text.contains("Indicators: 0 of 1 lit\n"));
        assert!(text.contains("Cruise buttons: +5  -5  80"));
        assert!(text.contains(&format!("  {:<24} 80\n", "soc")));
    }

    #[test]
    fn test_console_notifier_counts() {
        let mut notifier = ConsoleNotifier::new(true);
        notifier.play_cue(AudioCue::Error);
        notifier.play_cue(AudioCue::Error);
        assert_eq!(notifier.cues[&AudioCue::Error], 2);
        assert_eq!(notifier.alerts, 0);
    }
}
