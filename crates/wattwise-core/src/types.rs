use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in milliseconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const MILLIS_PER_MINUTE: i64 = 60_000;
    pub const MILLIS_PER_HOUR: i64 = 3_600_000;

    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }

    /// Milliseconds elapsed from `self` to `later`, never negative.
    pub fn millis_until(&self, later: Timestamp) -> i64 {
        (later.0 - self.0).max(0)
    }

    /// Fractional minutes elapsed from `self` to `later`, never negative.
    pub fn minutes_until(&self, later: Timestamp) -> f64 {
        self.millis_until(later) as f64 / Self::MILLIS_PER_MINUTE as f64
    }

    /// Shift by a signed number of minutes.
    pub fn minus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 - minutes * Self::MILLIS_PER_MINUTE)
    }
}

/// Clamp a score into `[min, max]`, mapping NaN to `min`.
pub fn clip(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_datetime_roundtrip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        assert_eq!(ts.to_datetime().timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp(1) < Timestamp(2));
        assert_eq!(Timestamp(5), Timestamp(5));
    }

    #[test]
    fn test_minutes_until() {
        let start = Timestamp(0);
        let later = Timestamp(45 * Timestamp::MILLIS_PER_MINUTE);
        assert!((start.minutes_until(later) - 45.0).abs() < f64::EPSILON);
        // Clock skew never yields negative inactivity.
        assert_eq!(later.minutes_until(start), 0.0);
    }

    #[test]
    fn test_minus_minutes() {
        let ts = Timestamp(10 * Timestamp::MILLIS_PER_MINUTE);
        assert_eq!(ts.minus_minutes(4), Timestamp(6 * Timestamp::MILLIS_PER_MINUTE));
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip(1.4, 0.0, 1.0), 1.0);
        assert_eq!(clip(-0.2, 0.0, 1.0), 0.0);
        assert_eq!(clip(0.25, 0.0, 1.0), 0.25);
        assert_eq!(clip(f64::NAN, 0.0, 1.0), 0.0);
    }
}
