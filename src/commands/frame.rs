//! Text frame grammar.
//!
//! ```text
//! frame      := led_cmd | buzzer_cmd
//! led_cmd    := "led." color "." duration
//! color      := "blue" | "green"
//! buzzer_cmd := "buzzer." duration
//! duration   := decimal integer, milliseconds
//! ```

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::gpio::Target;

/// A recognised request to pulse one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseCommand {
    pub target: Target,
    pub duration: Duration,
}

/// Literal, case-sensitive prefix selecting each target.
pub fn prefix(target: Target) -> &'static str {
    match target {
        Target::BlueLed => "led.blue.",
        Target::GreenLed => "led.green.",
        Target::Buzzer => "buzzer.",
    }
}

/// Match `frame` against the known prefixes in order.
///
/// Returns `Ok(None)` when no prefix matches; such frames are not errors.
/// A matching prefix followed by an unusable duration is an error and the
/// frame must be rejected.
pub fn parse_frame(frame: &str, max: Duration) -> Result<Option<PulseCommand>> {
    for target in Target::ALL {
        if let Some(rest) = frame.strip_prefix(prefix(target)) {
            let duration =
                parse_duration(rest, max).with_context(|| format!("invalid {target} duration"))?;
            return Ok(Some(PulseCommand { target, duration }));
        }
    }
    Ok(None)
}

/// Parse a non-negative decimal millisecond count no larger than `max`.
/// Surrounding ASCII whitespace is ignored.
pub fn parse_duration(text: &str, max: Duration) -> Result<Duration> {
    let digits = text.trim_matches(|c: char| c.is_ascii_whitespace());
    if digits.is_empty() {
        bail!("empty duration");
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("duration {digits:?} is not a decimal integer");
    }
    let millis: u64 = digits
        .parse()
        .with_context(|| format!("duration {digits:?} is too large"))?;
    let duration = Duration::from_millis(millis);
    if duration > max {
        bail!("duration {millis}ms exceeds the {}ms limit", max.as_millis());
    }
    Ok(duration)
}
