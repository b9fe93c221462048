//! Process-wide time-search state shared across requests.

use cdata_common::TimeWindow;
use chrono::{DateTime, Duration, Utc};

/// Margins of the last time-bounded lookup and the last data time served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageWindow {
    margins: Option<(Duration, Duration)>,
    last_served: Option<DateTime<Utc>>,
}

impl CoverageWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the margins of a window used for a lookup.
    pub fn remember(&mut self, window: &TimeWindow) {
        self.margins = Some(window.margins());
    }

    /// Remembered `(before, after)` margins, or `default` on both sides.
    pub fn margins_or(&self, default: Duration) -> (Duration, Duration) {
        self.margins.unwrap_or((default, default))
    }

    /// A window around `center` using the remembered margins.
    pub fn window_around(&self, center: DateTime<Utc>, default: Duration) -> TimeWindow {
        let (before, after) = self.margins_or(default);
        TimeWindow::from_margins(center, before, after)
    }

    pub fn record_served(&mut self, time: DateTime<Utc>) {
        self.last_served = Some(time);
    }

    pub fn last_served(&self) -> Option<DateTime<Utc>> {
        self.last_served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults_until_remembered() {
        let mut state = CoverageWindow::new();
        let center = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let w = state.window_around(center, Duration::minutes(10));
        assert_eq!(w.margins(), (Duration::minutes(10), Duration::minutes(10)));

        let used = TimeWindow::from_margins(center, Duration::minutes(30), Duration::minutes(5));
        state.remember(&used);
        let w = state.window_around(center, Duration::minutes(10));
        assert_eq!(w.margins(), (Duration::minutes(30), Duration::minutes(5)));
    }

    #[test]
    fn test_last_served() {
        let mut state = CoverageWindow::new();
        assert!(state.last_served().is_none());
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        state.record_served(t);
        assert_eq!(state.last_served(), Some(t));
    }
}
