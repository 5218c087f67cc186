use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// How line identifiers in the configuration are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinNumbering {
    /// Physical pin on the 40-pin header.
    #[default]
    Board,
    /// Broadcom GPIO number.
    Bcm,
}

// (physical pin, BCM GPIO) for every GPIO-capable pin of the 40-pin header.
const BOARD_TO_BCM: [(u8, u8); 28] = [
    (3, 2),
    (5, 3),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 27),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
    (27, 0),
    (28, 1),
    (29, 5),
    (31, 6),
    (32, 12),
    (33, 13),
    (35, 19),
    (36, 16),
    (37, 26),
    (38, 20),
    (40, 21),
];

const BCM_MAX: u8 = 27;

impl PinNumbering {
    /// Translate a configured line identifier into a BCM GPIO number.
    pub fn to_bcm(self, line: u8) -> Result<u8> {
        match self {
            PinNumbering::Board => match BOARD_TO_BCM.iter().find(|(board, _)| *board == line) {
                Some((_, bcm)) => Ok(*bcm),
                None => bail!("header pin {line} is not a GPIO pin"),
            },
            PinNumbering::Bcm => {
                if line > BCM_MAX {
                    bail!("GPIO{line} is out of range (0-{BCM_MAX})");
                }
                Ok(line)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_pins_map_to_bcm() {
        assert_eq!(PinNumbering::Board.to_bcm(19).unwrap(), 10);
        assert_eq!(PinNumbering::Board.to_bcm(18).unwrap(), 24);
        assert_eq!(PinNumbering::Board.to_bcm(16).unwrap(), 23);
    }

    #[test]
    fn power_and_ground_pins_are_rejected() {
        for pin in [1, 2, 4, 6, 9, 14, 17, 20, 25, 30, 34, 39, 41] {
            assert!(PinNumbering::Board.to_bcm(pin).is_err(), "pin {pin}");
        }
    }

    #[test]
    fn bcm_is_passed_through() {
        assert_eq!(PinNumbering::Bcm.to_bcm(0).unwrap(), 0);
        assert_eq!(PinNumbering::Bcm.to_bcm(27).unwrap(), 27);
        let err = PinNumbering::Bcm.to_bcm(28).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn parses_lowercase_names() {
        let n: PinNumbering = serde_json::from_str("\"bcm\"").unwrap();
        assert_eq!(n, PinNumbering::Bcm);
        assert_eq!(PinNumbering::default(), PinNumbering::Board);
    }
}
