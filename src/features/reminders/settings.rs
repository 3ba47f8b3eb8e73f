//! Reminder settings and their sanitation rules

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_INTERVAL_MINUTES: i64 = 30;
pub const DEFAULT_WINDOW_START: u32 = 0;
pub const DEFAULT_WINDOW_END: u32 = 24;
/// Longest accepted interval, one year
pub const MAX_INTERVAL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    /// Raw stored interval; use [`ReminderSettings::effective_interval`] to schedule
    pub interval_minutes: i64,
    /// First hour (0-23) in which reminders may fire
    pub window_start_hour: u32,
    /// Hour (1-24) at which the window closes, exclusive
    pub window_end_hour: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        ReminderSettings {
            enabled: true,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            window_start_hour: DEFAULT_WINDOW_START,
            window_end_hour: DEFAULT_WINDOW_END,
        }
    }
}

impl ReminderSettings {
    /// Build settings from persisted JSON values. Absent values take their
    /// defaults; a present but non-numeric interval reads as 1 minute.
    pub fn from_values(
        enabled: Option<&Value>,
        interval: Option<&Value>,
        start: Option<&Value>,
        end: Option<&Value>,
    ) -> Self {
        let enabled = enabled.and_then(Value::as_bool).unwrap_or(true);
        let interval_minutes = match interval {
            None | Some(Value::Null) => DEFAULT_INTERVAL_MINUTES,
            Some(v) => clamp_interval(as_integer(v).unwrap_or(1)),
        };
        let start = start.and_then(as_integer).unwrap_or(DEFAULT_WINDOW_START as i64);
        let end = end.and_then(as_integer).unwrap_or(DEFAULT_WINDOW_END as i64);

        ReminderSettings {
            enabled,
            interval_minutes,
            window_start_hour: clamp_start(start),
            window_end_hour: clamp_end(end),
        }
    }

    /// Clamp every field into its valid range, as done when the user saves
    pub fn sanitized(self) -> Self {
        ReminderSettings {
            enabled: self.enabled,
            interval_minutes: clamp_interval(self.interval_minutes),
            window_start_hour: clamp_start(self.window_start_hour as i64),
            window_end_hour: clamp_end(self.window_end_hour as i64),
        }
    }

    /// Interval at which the reminder timer fires, between one minute and
    /// [`MAX_INTERVAL_MINUTES`]
    pub fn effective_interval(&self) -> Duration {
        let minutes = clamp_interval(self.interval_minutes) as u64;
        Duration::from_secs(minutes.saturating_mul(60))
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn clamp_interval(minutes: i64) -> i64 {
    minutes.clamp(1, MAX_INTERVAL_MINUTES)
}

fn clamp_start(hour: i64) -> u32 {
    hour.clamp(0, 23) as u32
}

fn clamp_end(hour: i64) -> u32 {
    if hour < 1 {
        DEFAULT_WINDOW_END
    } else {
        hour.min(24) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = ReminderSettings::from_values(None, None, None, None);
        assert_eq!(settings, ReminderSettings::default());
        assert_eq!(settings.effective_interval(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_non_positive_interval_clamped_to_one_minute() {
        for raw in [0, -5] {
            let settings = ReminderSettings {
                interval_minutes: raw,
                ..Default::default()
            };
            assert_eq!(settings.effective_interval(), Duration::from_secs(60));
        }
    }

    #[test]
    fn test_huge_interval_capped() {
        let stored = ReminderSettings::from_values(None, Some(&json!(i64::MAX)), None, None);
        assert_eq!(stored.interval_minutes, MAX_INTERVAL_MINUTES);

        let raw = ReminderSettings {
            interval_minutes: i64::MAX,
            ..Default::default()
        };
        assert_eq!(raw.sanitized().interval_minutes, MAX_INTERVAL_MINUTES);
        assert_eq!(
            raw.effective_interval(),
            Duration::from_secs(MAX_INTERVAL_MINUTES as u64 * 60)
        );
    }

    #[test]
    fn test_non_numeric_interval_reads_as_one() {
        let settings = ReminderSettings::from_values(None, Some(&json!("often")), None, None);
        assert_eq!(settings.interval_minutes, 1);
        assert_eq!(settings.effective_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_numeric_string_interval_accepted() {
        let settings = ReminderSettings::from_values(None, Some(&json!("45")), None, None);
        assert_eq!(settings.interval_minutes, 45);
    }

    #[test]
    fn test_window_hours_clamped() {
        let settings = ReminderSettings::from_values(
            Some(&json!(false)),
            Some(&json!(10)),
            Some(&json!(-3)),
            Some(&json!(0)),
        );
        assert!(!settings.enabled);
        assert_eq!(settings.window_start_hour, 0);
        assert_eq!(settings.window_end_hour, 24);

        let settings = ReminderSettings::from_values(None, None, Some(&json!(30)), Some(&json!(99)));
        assert_eq!(settings.window_start_hour, 23);
        assert_eq!(settings.window_end_hour, 24);
    }

    #[test]
    fn test_sanitized() {
        let raw = ReminderSettings {
            enabled: true,
            interval_minutes: 0,
            window_start_hour: 40,
            window_end_hour: 0,
        };
        let clean = raw.sanitized();
        assert_eq!(clean.interval_minutes, 1);
        assert_eq!(clean.window_start_hour, 23);
        assert_eq!(clean.window_end_hour, 24);
    }
}
