//! Outbound operator commands
//!
//! Commands travel back to the controller over the same message channel as plain
//! strings (`cruise=+5`, `regen=true`, `stopCharge`, ...). Sending is fire-and-forget:
//! nothing waits for an acknowledgement.

use crate::types::Result;
use std::fmt;

/// The transport end owned by the dashboard controller
///
/// The connection lifecycle and retries belong to the implementation; the dashboard
/// only starts it, stops it and posts outgoing strings.
pub trait ChannelHandle {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn post_message(&mut self, message: &str) -> Result<()>;
}

/// An operator command understood by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Change the cruise target by a signed step (`cruise=+5`, `cruise=-5`)
    CruiseAdjust(i32),
    /// Set an absolute cruise target (`cruise=80`)
    CruiseSetSpeed(u16),
    CruiseToggle,
    Regen(bool),
    Creep(bool),
    PowerSteering(bool),
    Heater(bool),
    /// Maximum charger input current in amps
    ChargeInput(f64),
    StopCharge,
    /// Any other string, forwarded verbatim
    Raw(String),
}

impl Command {
    /// Parse a wire string; unrecognised strings become [`Command::Raw`]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.split_once('=') {
            Some((key, value)) if !key.is_empty() => match key {
                "cruise" => parse_cruise(value).unwrap_or_else(|| Command::Raw(input.to_string())),
                "regen" => Command::Regen(value == "true"),
                "creep" => Command::Creep(value == "true"),
                "ehps" => Command::PowerSteering(value == "true"),
                "heater" => Command::Heater(value == "true"),
                "chargeInput" => value
                    .parse()
                    .map(Command::ChargeInput)
                    .unwrap_or_else(|_| Command::Raw(input.to_string())),
                _ => Command::Raw(input.to_string()),
            },
            _ => match input {
                "cruiseToggle" => Command::CruiseToggle,
                "stopCharge" => Command::StopCharge,
                _ => Command::Raw(input.to_string()),
            },
        }
    }
}

fn parse_cruise(value: &str) -> Option<Command> {
    if value.starts_with('+') || value.starts_with('-') {
        value.parse().ok().map(Command::CruiseAdjust)
    } else {
        value.parse().ok().map(Command::CruiseSetSpeed)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CruiseAdjust(step) => write!(f, "cruise={:+}", step),
            Command::CruiseSetSpeed(speed) => write!(f, "cruise={}", speed),
            Command::CruiseToggle => write!(f, "cruiseToggle"),
            Command::Regen(on) => write!(f, "regen={}", on),
            Command::Creep(on) => write!(f, "creep={}", on),
            Command::PowerSteering(on) => write!(f, "ehps={}", on),
            Command::Heater(on) => write!(f, "heater={}", on),
            Command::ChargeInput(amps) => write!(f, "chargeInput={}", amps),
            Command::StopCharge => write!(f, "stopCharge"),
            Command::Raw(text) => write!(f, "{}", text),
        }
    }
}

/// Sends commands through a borrowed channel handle
pub struct CommandChannel<'a, H: ChannelHandle> {
    handle: &'a mut H,
}

impl<'a, H: ChannelHandle> CommandChannel<'a, H> {
    pub fn new(handle: &'a mut H) -> Self {
        Self { handle }
    }

    /// Forward a command string verbatim, empty strings included
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        log::debug!("Sending command: {}", command);
        self.handle.post_message(command)
    }

    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.send_command(&command.to_string())
    }
}

/// Cruise-control button setup sent by the controller on connect
#[derive(Debug, Clone, PartialEq)]
pub struct CruiseSetup {
    /// Target is an rpm value rather than a vehicle speed
    pub use_rpm: bool,
    pub speed_step: u16,
    pub speed_set: Vec<u16>,
}

/// A cruise-control button: its label and the command it sends
#[derive(Debug, Clone, PartialEq)]
pub struct CruiseButton {
    pub label: String,
    pub command: Command,
}

impl CruiseSetup {
    pub fn unit_label(&self) -> &'static str {
        if self.use_rpm {
            "rpm"
        } else {
            "kmh"
        }
    }

    /// Step up, step down, then one button per preset speed
    pub fn buttons(&self) -> Vec<CruiseButton> {
        let step = i32::from(self.speed_step);
        let mut buttons = vec![
            CruiseButton {
                label: format!("+{}", self.speed_step),
                command: Command::CruiseAdjust(step),
            },
            CruiseButton {
                label: format!("-{}", self.speed_step),
                command: Command::CruiseAdjust(-step),
            },
        ];
        buttons.extend(self.speed_set.iter().map(|&speed| CruiseButton {
            label: speed.to_string(),
            command: Command::CruiseSetSpeed(speed),
        }));
        buttons
    }
}

/// Selectable charger input current levels
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeOptions {
    levels: Vec<f64>,
    selected: Option<usize>,
}

impl ChargeOptions {
    /// The last level is preselected
    pub fn new(levels: Vec<f64>) -> Self {
        let selected = levels.len().checked_sub(1);
        Self { levels, selected }
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn selected(&self) -> Option<f64> {
        self.selected.map(|idx| self.levels[idx])
    }

    /// Select a level and return the command announcing it, `None` if not offered
    pub fn select(&mut self, level: f64) -> Option<Command> {
        let idx = self.levels.iter().position(|&l| l == level)?;
        self.selected = Some(idx);
        Some(Command::ChargeInput(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<String>,
    }

    impl ChannelHandle for Recorder {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            Ok(())
        }

        fn post_message(&mut self, message: &str) -> Result<()> {
            self.sent.push(message.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_command_wire_format() {
        assert_eq!(Command::CruiseAdjust(5).to_string(), "cruise=+5");
        assert_eq!(Command::CruiseAdjust(-5).to_string(), "cruise=-5");
        assert_eq!(Command::CruiseSetSpeed(80).to_string(), "cruise=80");
        assert_eq!(Command::Regen(true).to_string(), "regen=true");
        assert_eq!(Command::PowerSteering(false).to_string(), "ehps=false");
        assert_eq!(Command::ChargeInput(16.0).to_string(), "chargeInput=16");
        assert_eq!(Command::StopCharge.to_string(), "stopCharge");
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("cruise=+10"), Command::CruiseAdjust(10));
        assert_eq!(Command::parse("cruise=-10"), Command::CruiseAdjust(-10));
        assert_eq!(Command::parse("cruise=120"), Command::CruiseSetSpeed(120));
        assert_eq!(Command::parse("heater=true"), Command::Heater(true));
        assert_eq!(Command::parse("creep=no"), Command::Creep(false));
        assert_eq!(Command::parse("chargeInput=10.5"), Command::ChargeInput(10.5));
        assert_eq!(Command::parse("cruiseToggle"), Command::CruiseToggle);
        assert_eq!(Command::parse("loadConfig"), Command::Raw("loadConfig".to_string()));
        assert_eq!(Command::parse("cruise=fast"), Command::Raw("cruise=fast".to_string()));
    }

    #[test]
    fn test_send_verbatim() {
        let mut recorder = Recorder::default();
        let mut channel = CommandChannel::new(&mut recorder);
        channel.send_command("cruise=+5").unwrap();
        channel.send(&Command::CruiseToggle).unwrap();
        channel.send_command("").unwrap();
        assert_eq!(recorder.sent, vec!["cruise=+5", "cruiseToggle", ""]);
    }

    #[test]
    fn test_cruise_buttons() {
        let setup = CruiseSetup {
            use_rpm: false,
            speed_step: 5,
            speed_set: vec![50, 80, 100],
        };
        let buttons = setup.buttons();
        let labels: Vec<&str> = buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["+5", "-5", "50", "80", "100"]);

        // The bound command is always `cruise=<label>`
        for button in &buttons {
            assert_eq!(button.command.to_string(), format!("cruise={}", button.label));
        }
        assert_eq!(setup.unit_label(), "kmh");
    }

    #[test]
    fn test_large_cruise_step_keeps_label() {
        let setup = CruiseSetup {
            use_rpm: true,
            speed_step: 40000,
            speed_set: vec![u16::MAX],
        };
        let buttons = setup.buttons();
        assert_eq!(buttons[0].command, Command::CruiseAdjust(40000));
        assert_eq!(buttons[1].command.to_string(), "cruise=-40000");
        for button in &buttons {
            assert_eq!(button.command.to_string(), format!("cruise={}", button.label));
        }
        assert_eq!(Command::parse("cruise=+40000"), Command::CruiseAdjust(40000));
    }

    #[test]
    fn test_charge_options() {
        let mut options = ChargeOptions::new(vec![6.0, 10.0, 16.0]);
        assert_eq!(options.selected(), Some(16.0));
        assert_eq!(options.select(10.0), Some(Command::ChargeInput(10.0)));
        assert_eq!(options.selected(), Some(10.0));
        assert_eq!(options.select(32.0), None);
        assert_eq!(ChargeOptions::new(vec![]).selected(), None);
    }
}
