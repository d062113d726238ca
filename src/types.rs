use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What a process does once an attempt ends.
///
/// `on_complete` picks the policy for exit code 0, `on_failure` for anything
/// else (including a failed spawn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Stay stopped (or go back to waiting for a trigger).
    #[default]
    Wait,
    /// Launch a fresh process, bounded by `restart_attempts`.
    Restart,
    /// Stop every other process in the run group.
    Buzzkill,
}

impl FromStr for ExitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wait" => Ok(ExitPolicy::Wait),
            "restart" => Ok(ExitPolicy::Restart),
            "buzzkill" => Ok(ExitPolicy::Buzzkill),
            other => Err(format!(
                "invalid exit policy: {other} (expected \"wait\", \"restart\" or \"buzzkill\")"
            )),
        }
    }
}

/// Restart budget of a process.
///
/// Configured as a signed integer: `0` never restarts, `N > 0` restarts up to
/// `N` times, any negative value restarts forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartAttempts {
    #[default]
    Never,
    Limited(u32),
    Unlimited,
}

impl RestartAttempts {
    pub fn from_signed(n: i64) -> Self {
        match n {
            0 => RestartAttempts::Never,
            n if n < 0 => RestartAttempts::Unlimited,
            n => RestartAttempts::Limited(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }

    /// True when at least one restart may happen.
    pub fn allows_restart(&self) -> bool {
        !matches!(self, RestartAttempts::Never | RestartAttempts::Limited(0))
    }

    /// Use up one restart. Returns `false` once the budget is exhausted;
    /// an unlimited budget never runs out.
    pub fn consume(&mut self) -> bool {
        match self {
            RestartAttempts::Never | RestartAttempts::Limited(0) => false,
            RestartAttempts::Limited(n) => {
                *n -= 1;
                true
            }
            RestartAttempts::Unlimited => true,
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
///
/// A bare `"0"` is accepted as zero.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let too_large = || format!("duration '{}' is too large", s);
    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(too_large),
        "h" => value
            .checked_mul(60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(too_large),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
