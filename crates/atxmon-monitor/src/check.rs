//! ATX publication check.
//!
//! One sequential pass; every backend call completes before the next starts.
//! Lookup and parse failures abort with [`MonitorError`]. Domain failures
//! (count mismatch, event outside the epoch window) are collected into the
//! report so it can be printed in full before the caller fails the run.

use std::fmt;

use atxmon_query::{format_log_timestamp, LogRecord, QueryClient};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::boundary::EpochBoundary;
use crate::error::MonitorError;
use crate::layers::EpochLayout;
use crate::queries::{atx_published_events, latest_released_layer, layer_release_ticks};

/// A domain invariant the observed epoch did not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    CountMismatch {
        epoch: u64,
        expected: u64,
        observed: u64,
    },
    OutsideEpoch {
        epoch: u64,
        /// Position of the event in the ascending event list.
        index: usize,
        node: Option<String>,
        timestamp: DateTime<Utc>,
        boundary: EpochBoundary,
    },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::CountMismatch {
                epoch,
                expected,
                observed,
            } => write!(
                f,
                "epoch {epoch}: number of ATX published {observed} not as expected {expected}"
            ),
            ValidationFailure::OutsideEpoch {
                epoch,
                index,
                node,
                timestamp,
                boundary,
            } => write!(
                f,
                "epoch {epoch}: ATX #{index} (node={}) at {} not in epoch window {}",
                node.as_deref().unwrap_or("unknown"),
                format_log_timestamp(timestamp),
                boundary
            ),
        }
    }
}

/// One ATX publication event as judged by the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxEventRow {
    pub node: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub in_window: bool,
}

/// Everything the check observed, plus its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxCheckReport {
    pub namespace: String,
    pub index: String,
    pub layers_per_epoch: u64,
    pub latest_layer: u64,
    pub epoch: u64,
    pub expected_count: u64,
    pub observed_count: u64,
    pub start_layer: u64,
    pub end_layer: u64,
    pub boundary: EpochBoundary,
    pub events: Vec<AtxEventRow>,
    pub failures: Vec<ValidationFailure>,
}

impl AtxCheckReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(self)` when every check held, otherwise [`MonitorError::Validation`].
    pub fn into_result(self) -> Result<Self, MonitorError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(MonitorError::Validation(self.failures))
        }
    }
}

impl fmt::Display for AtxCheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "namespace={} index={}", self.namespace, self.index)?;
        writeln!(
            f,
            "latest_released_layer={} layers_per_epoch={}",
            self.latest_layer, self.layers_per_epoch
        )?;
        writeln!(f, "epoch_to_monitor={}", self.epoch)?;
        writeln!(
            f,
            "expected_atx={} observed_atx={}",
            self.expected_count, self.observed_count
        )?;
        writeln!(
            f,
            "start_layer={} end_layer={}",
            self.start_layer, self.end_layer
        )?;
        writeln!(
            f,
            "start={} end={}",
            format_log_timestamp(&self.boundary.start),
            format_log_timestamp(&self.boundary.end)
        )?;
        for ev in &self.events {
            writeln!(
                f,
                "atx_time={} node={} in_window={}",
                format_log_timestamp(&ev.timestamp),
                ev.node.as_deref().unwrap_or("unknown"),
                ev.in_window
            )?;
        }
        if self.passed() {
            write!(f, "result=PASS")
        } else {
            write!(f, "result=FAIL failures={}", self.failures.len())?;
            for v in &self.failures {
                write!(f, "\nfailure: {v}")?;
            }
            Ok(())
        }
    }
}

/// Identify the emitting node, if the record says.
fn node_of(rec: &LogRecord) -> Option<String> {
    ["node_id", "kubernetes.pod_name"]
        .iter()
        .find_map(|k| rec.field(k).and_then(|v| v.as_str()).map(str::to_string))
}

struct EpochWindow {
    start_layer: u64,
    end_layer: u64,
    boundary: EpochBoundary,
    rows: Vec<AtxEventRow>,
}

/// Derive the epoch window and judge every event against it.
///
/// Out-of-window events are pushed onto `failures`.
async fn judge_window(
    client: &QueryClient,
    layout: EpochLayout,
    epoch: u64,
    events: &[LogRecord],
    failures: &mut Vec<ValidationFailure>,
) -> Result<EpochWindow, MonitorError> {
    let start_layer = layout.start_layer(epoch);
    let end_layer = layout.end_layer(epoch);
    let start_ticks = layer_release_ticks(client, Some(start_layer)).await?;
    let end_ticks = layer_release_ticks(client, Some(end_layer)).await?;
    let boundary = EpochBoundary::from_ticks(start_layer, &start_ticks, end_layer, &end_ticks)?;
    if !boundary.is_well_ordered() {
        warn!(epoch, %boundary, "epoch window start is not before end");
    }
    info!(epoch, start_layer, end_layer, %boundary, "epoch window");

    let mut rows: Vec<AtxEventRow> = Vec::with_capacity(events.len());
    for (index, ev) in events.iter().enumerate() {
        let timestamp = ev.instant()?;
        let node = node_of(ev);
        let in_window = boundary.contains(timestamp);
        if !in_window {
            warn!(epoch, index, node = ?node, %timestamp, "atx published outside epoch window");
            failures.push(ValidationFailure::OutsideEpoch {
                epoch,
                index,
                node: node.clone(),
                timestamp,
                boundary,
            });
        }
        rows.push(AtxEventRow {
            node,
            timestamp,
            in_window,
        });
    }

    Ok(EpochWindow {
        start_layer,
        end_layer,
        boundary,
        rows,
    })
}

/// Run the ATX publication check for the client's namespace.
///
/// A fatal error after the count check has already failed is returned as
/// [`MonitorError::Aborted`], so the count verdict is never lost.
pub async fn check_atx_publication(
    client: &QueryClient,
    layout: EpochLayout,
    expected_count: u64,
) -> Result<AtxCheckReport, MonitorError> {
    // epoch to monitor
    let (latest_layer, latest_t) = latest_released_layer(client).await?;
    let epoch = layout
        .epoch_to_monitor(latest_layer)
        .ok_or(MonitorError::EpochNotComplete {
            latest_layer,
            layers_per_epoch: layout.layers_per_epoch(),
        })?;
    info!(
        namespace = client.namespace(),
        latest_layer,
        latest_t = %latest_t,
        epoch,
        "epoch to monitor"
    );

    // events and count
    let events = atx_published_events(client, epoch).await?;
    let observed_count = events.len() as u64;
    info!(epoch, observed_count, expected_count, "atx published");

    let mut failures: Vec<ValidationFailure> = Vec::new();
    if observed_count != expected_count {
        failures.push(ValidationFailure::CountMismatch {
            epoch,
            expected: expected_count,
            observed: observed_count,
        });
    }

    let EpochWindow {
        start_layer,
        end_layer,
        boundary,
        rows,
    } = match judge_window(client, layout, epoch, &events, &mut failures).await {
        Ok(w) => w,
        Err(cause) if !failures.is_empty() => {
            return Err(MonitorError::Aborted {
                failures,
                cause: Box::new(cause),
            })
        }
        Err(cause) => return Err(cause),
    };

    Ok(AtxCheckReport {
        namespace: client.namespace().to_string(),
        index: client.index().to_string(),
        layers_per_epoch: layout.layers_per_epoch(),
        latest_layer,
        epoch,
        expected_count,
        observed_count,
        start_layer,
        end_layer,
        boundary,
        events: rows,
        failures,
    })
}
