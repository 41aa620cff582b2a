use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Clock domain shared by every trace loaded into one timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampType {
    /// Wall clock, nanoseconds since the Unix epoch.
    Real,
    /// Nanoseconds since device boot.
    Elapsed,
}

impl TimestampType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Elapsed => "elapsed",
        }
    }
}

impl fmt::Display for TimestampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point on one clock domain.
///
/// Timestamps of different types are not comparable, so there is no `Ord`
/// impl; searches compare [`Timestamp::value_ns`] within a single domain.
/// A zero value marks an invalid timestamp (dumps carry no real time).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    timestamp_type: TimestampType,
    value_ns: i64,
}

impl Timestamp {
    pub fn new(timestamp_type: TimestampType, value_ns: i64) -> Self {
        Self {
            timestamp_type,
            value_ns,
        }
    }

    pub fn real(value_ns: i64) -> Self {
        Self::new(TimestampType::Real, value_ns)
    }

    pub fn elapsed(value_ns: i64) -> Self {
        Self::new(TimestampType::Elapsed, value_ns)
    }

    pub fn timestamp_type(&self) -> TimestampType {
        self.timestamp_type
    }

    pub fn value_ns(&self) -> i64 {
        self.value_ns
    }

    pub fn is_valid(&self) -> bool {
        self.value_ns != 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp_type {
            TimestampType::Real => {
                let utc = DateTime::from_timestamp_nanos(self.value_ns);
                write!(f, "{}", utc.format("%Y-%m-%dT%H:%M:%S%.9fZ"))
            }
            TimestampType::Elapsed => f.write_str(&format_elapsed_ns(self.value_ns)),
        }
    }
}

/// Closed range between two timestamps of the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// Saturates at the `i64` bounds for ranges spanning most of the clock.
    pub fn duration_ns(&self) -> i64 {
        self.to.value_ns().saturating_sub(self.from.value_ns())
    }

    /// Human duration of the range, e.g. `5m0s0ms0ns`.
    pub fn format_duration(&self) -> String {
        format_elapsed_ns(self.duration_ns())
    }
}

const NS_PER_MS: i64 = 1_000_000;
const NS_PER_S: i64 = 1_000 * NS_PER_MS;
const NS_PER_M: i64 = 60 * NS_PER_S;
const NS_PER_H: i64 = 60 * NS_PER_M;

/// Format a nanosecond count as `1h2m3s4ms5ns`, dropping leading zero units.
pub fn format_elapsed_ns(value_ns: i64) -> String {
    let sign = if value_ns < 0 { "-" } else { "" };
    let mut rest = value_ns.unsigned_abs();
    let units: [(u64, &str); 5] = [
        (NS_PER_H as u64, "h"),
        (NS_PER_M as u64, "m"),
        (NS_PER_S as u64, "s"),
        (NS_PER_MS as u64, "ms"),
        (1, "ns"),
    ];

    let mut out = String::from(sign);
    let mut started = false;
    for (size, suffix) in units {
        let amount = rest / size;
        rest %= size;
        if amount > 0 || started || size == 1 {
            started = true;
            out.push_str(&format!("{amount}{suffix}"));
        }
    }
    out
}
