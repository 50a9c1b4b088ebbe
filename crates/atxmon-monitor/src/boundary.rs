use std::fmt;

use atxmon_query::{format_log_timestamp, LogRecord};
use chrono::{DateTime, Utc};

use crate::error::MonitorError;

/// Wall-clock window of one epoch.
///
/// `start` is exclusive, `end` is inclusive: an event logged at exactly
/// `start` belongs to the previous epoch's tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochBoundary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EpochBoundary {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Derive the window from release ticks of the epoch's first and last layer.
    ///
    /// start = earliest tick of `start_layer`, end = latest tick of `end_layer`.
    /// Every tick timestamp must parse.
    pub fn from_ticks(
        start_layer: u64,
        start_ticks: &[LogRecord],
        end_layer: u64,
        end_ticks: &[LogRecord],
    ) -> Result<Self, MonitorError> {
        let start = sorted_instants(start_ticks)?
            .first()
            .copied()
            .ok_or(MonitorError::NoReleaseTicks { layer: start_layer })?;
        let end = sorted_instants(end_ticks)?
            .last()
            .copied()
            .ok_or(MonitorError::NoReleaseTicks { layer: end_layer })?;
        Ok(Self { start, end })
    }

    /// `start < t <= end`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start < t && t <= self.end
    }

    /// `start < end`; false indicates clock skew or a stalled network.
    pub fn is_well_ordered(&self) -> bool {
        self.start < self.end
    }
}

impl fmt::Display for EpochBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}]",
            format_log_timestamp(&self.start),
            format_log_timestamp(&self.end)
        )
    }
}

fn sorted_instants(ticks: &[LogRecord]) -> Result<Vec<DateTime<Utc>>, MonitorError> {
    let mut out = ticks
        .iter()
        .map(|r| r.instant())
        .collect::<Result<Vec<_>, _>>()?;
    out.sort();
    Ok(out)
}
