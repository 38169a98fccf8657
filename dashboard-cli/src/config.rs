//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use dashboard_core::{ChargeOptions, CruiseSetup, DashboardConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub cruise: Option<CruiseConfig>,
    #[serde(default)]
    pub charger: Option<ChargerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Telemetry stream to replay (one JSON batch per line)
    pub stream: Option<PathBuf>,
    /// Delay between replayed batches
    #[serde(default)]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CruiseConfig {
    #[serde(default)]
    pub use_rpm: bool,
    pub speed_step: u16,
    #[serde(default)]
    pub speed_set: Vec<u16>,
}

impl From<&CruiseConfig> for CruiseSetup {
    fn from(config: &CruiseConfig) -> Self {
        CruiseSetup {
            use_rpm: config.use_rpm,
            speed_step: config.speed_step,
            speed_set: config.speed_set.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargerConfig {
    pub input_levels: Vec<f64>,
}

impl From<&ChargerConfig> for ChargeOptions {
    fn from(config: &ChargerConfig) -> Self {
        ChargeOptions::new(config.input_levels.clone())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .dashboard
        .validate()
        .with_context(|| format!("Invalid dashboard section in {:?}", path))?;

    if let Some(cruise) = &config.cruise {
        if cruise.speed_step == 0 {
            bail!("cruise.speed_step must be greater than zero");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::StateId;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [input]
        stream = "telemetry.jsonl"
        interval_ms = 100

        [dashboard]
        value_targets = ["soc", "socMeter"]
        default_state = 0

        [[dashboard.gauges]]
        name = "speedActual"
        min = 0
        max = 8000

        [[dashboard.panels]]
        id = "state_1_2_"

        [[dashboard.panels]]
        id = "charging"
        states = [5, 6]

        [[dashboard.bitfields]]
        channel = "bitfieldMotor"
        width = 4
        indicators = ["ready", "running", "warning", "fault"]

        [cruise]
        use_rpm = true
        speed_step = 250
        speed_set = [1000, 2000]

        [charger]
        input_levels = [6.0, 10.0, 16.0]
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.input.interval_ms, 100);
        assert_eq!(config.dashboard.gauges[0].max, Some(8000.0));
        assert_eq!(config.dashboard.panels[1].states, vec![StateId::from(5), StateId::from(6)]);
        assert_eq!(config.dashboard.bitfields[0].width, 4);
        assert_eq!(config.dashboard.cruise_panel, "cruiseControl");

        let setup = CruiseSetup::from(config.cruise.as_ref().unwrap());
        assert_eq!(setup.unit_label(), "rpm");
        assert_eq!(setup.buttons().len(), 4);

        let options = ChargeOptions::from(config.charger.as_ref().unwrap());
        assert_eq!(options.selected(), Some(16.0));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.input.stream, Some(PathBuf::from("telemetry.jsonl")));
    }

    #[test]
    fn test_load_config_rejects_invalid_dashboard() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[dashboard]\ndefault_bitfield_width = 99\n").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());
    }
}
