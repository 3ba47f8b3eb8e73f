//! Hour-of-day window checks and the clock that feeds them

use chrono::Timelike;

/// Whether `hour` (0-23) falls inside the `[start, end)` window.
///
/// A window with `start > end` wraps past midnight. `start == end` is empty.
pub fn in_window(start: u32, end: u32, hour: u32) -> bool {
    if start <= end {
        start <= hour && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Source of the current local hour
pub trait Clock: Send + Sync {
    fn current_hour(&self) -> u32;
}

/// System clock in the local timezone
pub struct LocalClock;

impl Clock for LocalClock {
    fn current_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Clock pinned to one hour
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn current_hour(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_window() {
        assert!(in_window(9, 17, 9));
        assert!(in_window(9, 17, 16));
        assert!(!in_window(9, 17, 17));
        assert!(!in_window(9, 17, 8));
    }

    #[test]
    fn test_unrestricted_window_accepts_every_hour() {
        assert!((0..24).all(|h| in_window(0, 24, h)));
    }

    #[test]
    fn test_wrapping_window() {
        assert!(in_window(22, 6, 23));
        assert!(in_window(22, 6, 22));
        assert!(in_window(22, 6, 0));
        assert!(in_window(22, 6, 5));
        assert!(!in_window(22, 6, 6));
        assert!(!in_window(22, 6, 12));
    }

    #[test]
    fn test_matches_definition_over_every_window() {
        for start in 0..=23u32 {
            for end in 1..=24u32 {
                for hour in 0..=23u32 {
                    let expected = if start <= end {
                        start <= hour && hour < end
                    } else {
                        hour >= start || hour < end
                    };
                    assert_eq!(in_window(start, end, hour), expected, "{start}-{end} @ {hour}");
                }
                // Start hour is inside every non-empty window, end hour never is
                if start != end {
                    assert!(in_window(start, end, start));
                }
                if end < 24 {
                    assert!(!in_window(start, end, end));
                }
            }
        }
    }

    #[test]
    fn test_empty_window() {
        assert!((0..24).all(|h| !in_window(7, 7, h)));
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(23).current_hour(), 23);
        assert!(LocalClock.current_hour() < 24);
    }
}
