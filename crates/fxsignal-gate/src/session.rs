//! Session windows, per-strategy spacing and the external pause check.

use chrono::{DateTime, Duration, FixedOffset, Offset, Timelike, Utc};
use fxsignal_core::NewsOracle;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use thiserror::Error;
use tracing::{debug, warn};

/// A named `[start_hour, end_hour)` window in the session reference timezone.
///
/// `start_hour > end_hour` wraps midnight (e.g. 22 -> 7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SessionWindow {
    pub fn new(name: impl Into<String>, start_hour: u32, end_hour: u32) -> Self {
        Self {
            name: name.into(),
            start_hour,
            end_hour,
            enabled: true,
        }
    }

    /// Whether `hour` (0..=23) falls inside the window.
    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            self.start_hour <= hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Why the filter held a signal back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("outside configured session windows")]
    OutsideSession,
    #[error("spacing not elapsed, {remaining_secs}s remaining")]
    Spacing { remaining_secs: i64 },
    #[error("paused by news/event oracle")]
    Paused,
}

/// Session and spacing filter for one strategy.
#[derive(Debug, Clone)]
pub struct SessionFilter {
    windows: Vec<SessionWindow>,
    offset: FixedOffset,
    restrict_to_windows: bool,
    min_spacing: Duration,
    last_approved: Option<DateTime<Utc>>,
}

impl SessionFilter {
    pub fn new(
        windows: Vec<SessionWindow>,
        offset: FixedOffset,
        restrict_to_windows: bool,
        min_spacing: Duration,
    ) -> Self {
        Self {
            windows,
            offset,
            restrict_to_windows,
            min_spacing,
            last_approved: None,
        }
    }

    /// A filter that never restricts by time and has no spacing.
    pub fn unrestricted() -> Self {
        Self::new(vec![], Utc.fix(), false, Duration::zero())
    }

    fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.offset).hour()
    }

    /// Whether `now` falls inside any enabled window.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        let hour = self.local_hour(now);
        self.windows
            .iter()
            .any(|w| w.enabled && w.contains_hour(hour))
    }

    /// Names of the enabled windows containing `now`.
    pub fn active_windows(&self, now: DateTime<Utc>) -> Vec<&str> {
        let hour = self.local_hour(now);
        self.windows
            .iter()
            .filter(|w| w.enabled && w.contains_hour(hour))
            .map(|w| w.name.as_str())
            .collect()
    }

    /// True if no approval happened within `min_spacing` of `now`.
    pub fn spacing_ok(&self, now: DateTime<Utc>) -> bool {
        self.remaining_spacing(now) <= Duration::zero()
    }

    fn remaining_spacing(&self, now: DateTime<Utc>) -> Duration {
        match self.last_approved {
            Some(last) => {
                let elapsed = now - last;
                let elapsed = if elapsed < Duration::zero() { -elapsed } else { elapsed };
                self.min_spacing - elapsed
            }
            None => Duration::zero(),
        }
    }

    pub fn last_approved(&self) -> Option<DateTime<Utc>> {
        self.last_approved
    }

    pub fn record_approval(&mut self, at: DateTime<Utc>) {
        self.last_approved = Some(at);
    }

    /// Forward a signal if the window, spacing and pause checks all pass.
    ///
    /// An admitted signal is recorded as the latest approval.
    pub fn admit(&mut self, now: DateTime<Utc>, paused: bool) -> Result<(), Rejection> {
        if self.restrict_to_windows && !self.in_window(now) {
            return Err(Rejection::OutsideSession);
        }
        if !self.spacing_ok(now) {
            return Err(Rejection::Spacing {
                remaining_secs: self.remaining_spacing(now).num_seconds(),
            });
        }
        if paused {
            return Err(Rejection::Paused);
        }
        self.record_approval(now);
        Ok(())
    }
}

/// Ask the oracle whether trading should pause.
///
/// Errors and timeouts are treated as "no pause".
pub async fn external_pause(
    oracle: &dyn NewsOracle,
    instruments: &[String],
    timeout: StdDuration,
) -> bool {
    match tokio::time::timeout(timeout, oracle.should_pause(instruments)).await {
        Ok(Ok(paused)) => {
            if paused {
                debug!(oracle = oracle.name(), ?instruments, "Oracle requested pause");
            }
            paused
        }
        Ok(Err(e)) => {
            warn!(oracle = oracle.name(), error = %e, "Pause check failed, not pausing");
            false
        }
        Err(_) => {
            warn!(
                oracle = oracle.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Pause check timed out, not pausing"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use fxsignal_core::error::DataError;
    use fxsignal_core::NoopOracle;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn london_newyork() -> Vec<SessionWindow> {
        vec![
            SessionWindow::new("London", 8, 17),
            SessionWindow::new("NewYork", 13, 22),
        ]
    }

    #[test]
    fn test_window_bounds() {
        let london = SessionWindow::new("London", 8, 17);
        assert!(london.contains_hour(8));
        assert!(london.contains_hour(16));
        assert!(!london.contains_hour(17));
        assert!(!london.contains_hour(7));
    }

    #[test]
    fn test_window_wraps_midnight() {
        let sydney = SessionWindow::new("Sydney", 22, 7);
        assert!(sydney.contains_hour(23));
        assert!(sydney.contains_hour(0));
        assert!(sydney.contains_hour(6));
        assert!(!sydney.contains_hour(7));
        assert!(!sydney.contains_hour(12));
    }

    #[test]
    fn test_in_window_and_overlap() {
        let filter = SessionFilter::new(
            london_newyork(),
            FixedOffset::east_opt(0).unwrap(),
            true,
            Duration::zero(),
        );

        assert!(filter.in_window(at(9, 0)));
        assert!(!filter.in_window(at(23, 0)));
        assert_eq!(filter.active_windows(at(14, 0)), vec!["London", "NewYork"]);
        assert_eq!(filter.active_windows(at(9, 0)), vec!["London"]);
    }

    #[test]
    fn test_reference_offset() {
        // 07:30 UTC is 08:30 at UTC+1
        let filter = SessionFilter::new(
            vec![SessionWindow::new("London", 8, 17)],
            FixedOffset::east_opt(3600).unwrap(),
            true,
            Duration::zero(),
        );
        assert!(filter.in_window(at(7, 30)));
    }

    #[test]
    fn test_disabled_window() {
        let mut windows = london_newyork();
        windows[0].enabled = false;
        let filter = SessionFilter::new(windows, FixedOffset::east_opt(0).unwrap(), true, Duration::zero());
        assert!(!filter.in_window(at(9, 0)));
    }

    #[test]
    fn test_spacing() {
        let mut filter = SessionFilter::new(
            london_newyork(),
            FixedOffset::east_opt(0).unwrap(),
            true,
            Duration::minutes(30),
        );

        assert!(filter.admit(at(9, 0), false).is_ok());
        assert_eq!(
            filter.admit(at(9, 10), false),
            Err(Rejection::Spacing { remaining_secs: 1200 })
        );
        assert!(filter.admit(at(9, 30), false).is_ok());
        assert_eq!(filter.last_approved(), Some(at(9, 30)));
    }

    #[test]
    fn test_admit_checks() {
        let mut filter = SessionFilter::new(
            london_newyork(),
            FixedOffset::east_opt(0).unwrap(),
            true,
            Duration::zero(),
        );
        assert_eq!(filter.admit(at(23, 0), false), Err(Rejection::OutsideSession));
        assert_eq!(filter.admit(at(10, 0), true), Err(Rejection::Paused));
        assert!(filter.last_approved().is_none());

        let mut open = SessionFilter::unrestricted();
        assert!(open.admit(at(23, 0), false).is_ok());
    }

    struct FailingOracle;

    #[async_trait]
    impl NewsOracle for FailingOracle {
        async fn should_pause(&self, _instruments: &[String]) -> Result<bool, DataError> {
            Err(DataError::Unavailable {
                instrument: "*".into(),
                reason: "feed down".into(),
            })
        }

        async fn sentiment(&self, _instruments: &[String]) -> Result<f64, DataError> {
            Ok(0.0)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct HangingOracle;

    #[async_trait]
    impl NewsOracle for HangingOracle {
        async fn should_pause(&self, _instruments: &[String]) -> Result<bool, DataError> {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
            Ok(true)
        }

        async fn sentiment(&self, _instruments: &[String]) -> Result<f64, DataError> {
            Ok(0.0)
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_external_pause_is_permissive_on_failure() {
        let instruments = vec!["EUR_USD".to_string()];
        let timeout = StdDuration::from_millis(20);

        assert!(!external_pause(&NoopOracle, &instruments, timeout).await);
        assert!(!external_pause(&FailingOracle, &instruments, timeout).await);
        assert!(!external_pause(&HangingOracle, &instruments, timeout).await);
    }
}
