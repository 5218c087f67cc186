use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical output driven by a pulse command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    BlueLed,
    GreenLed,
    Buzzer,
}

impl Target {
    /// Every target, in the order frames are matched against them.
    pub const ALL: [Target; 3] = [Target::BlueLed, Target::GreenLed, Target::Buzzer];
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Target::BlueLed => "led.blue",
            Target::GreenLed => "led.green",
            Target::Buzzer => "buzzer",
        };
        f.write_str(name)
    }
}

fn default_blue() -> u8 {
    19
}
fn default_green() -> u8 {
    18
}
fn default_buzzer() -> u8 {
    16
}

/// Binds each target to a line identifier (physical header pin by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap {
    #[serde(default = "default_blue")]
    pub blue: u8,
    #[serde(default = "default_green")]
    pub green: u8,
    #[serde(default = "default_buzzer")]
    pub buzzer: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            blue: default_blue(),
            green: default_green(),
            buzzer: default_buzzer(),
        }
    }
}

impl PinMap {
    pub fn line(&self, target: Target) -> u8 {
        match target {
            Target::BlueLed => self.blue,
            Target::GreenLed => self.green,
            Target::Buzzer => self.buzzer,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Target, u8)> + '_ {
        Target::ALL.into_iter().map(move |t| (t, self.line(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_uses_deployment_lines() {
        let pins = PinMap::default();
        assert_eq!(pins.line(Target::BlueLed), 19);
        assert_eq!(pins.line(Target::GreenLed), 18);
        assert_eq!(pins.line(Target::Buzzer), 16);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let pins: PinMap = serde_json::from_str(r#"{"buzzer": 40}"#).unwrap();
        assert_eq!(pins.blue, 19);
        assert_eq!(pins.green, 18);
        assert_eq!(pins.buzzer, 40);
    }

    #[test]
    fn iter_follows_match_order() {
        let order: Vec<Target> = PinMap::default().iter().map(|(t, _)| t).collect();
        assert_eq!(order, Target::ALL.to_vec());
    }
}
