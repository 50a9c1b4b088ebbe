use std::fmt;

use atxmon_query::{QueryError, TimestampError};

use crate::check::ValidationFailure;

/// Everything that aborts an ATX check.
///
/// None of these are recovered inside the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Lookup failed: not found, backend failure, or malformed hit.
    Query(QueryError),
    /// A `T` value did not parse.
    Timestamp(TimestampError),
    /// A record lacks a field the check depends on.
    MissingField { field: &'static str, record: String },
    /// The network has not completed an epoch yet.
    EpochNotComplete { latest_layer: u64, layers_per_epoch: u64 },
    /// No release tick exists for a boundary layer.
    NoReleaseTicks { layer: u64 },
    InvalidLayout(String),
    /// One or more domain checks failed.
    Validation(Vec<ValidationFailure>),
    /// A fatal error hit after domain checks had already failed.
    Aborted {
        failures: Vec<ValidationFailure>,
        cause: Box<MonitorError>,
    },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Query(err) => write!(f, "query failed: {err}"),
            MonitorError::Timestamp(err) => write!(f, "{err}"),
            MonitorError::MissingField { field, record } => {
                write!(f, "log record missing field '{field}': {record}")
            }
            MonitorError::EpochNotComplete {
                latest_layer,
                layers_per_epoch,
            } => write!(
                f,
                "no completed epoch to monitor yet: latest released layer {latest_layer} \
                 is inside epoch 0 ({layers_per_epoch} layers per epoch)"
            ),
            MonitorError::NoReleaseTicks { layer } => {
                write!(f, "no release tick found for layer {layer}")
            }
            MonitorError::InvalidLayout(msg) => write!(f, "invalid epoch layout: {msg}"),
            MonitorError::Validation(failures) => write_failures(f, failures),
            MonitorError::Aborted { failures, cause } => {
                write_failures(f, failures)?;
                write!(f, "; check aborted: {cause}")
            }
        }
    }
}

fn write_failures(f: &mut fmt::Formatter<'_>, failures: &[ValidationFailure]) -> fmt::Result {
    write!(f, "ATX validation failed")?;
    for (i, v) in failures.iter().enumerate() {
        let sep = if i == 0 { ": " } else { "; " };
        write!(f, "{sep}{v}")?;
    }
    Ok(())
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Query(err) => Some(err),
            MonitorError::Timestamp(err) => Some(err),
            MonitorError::Aborted { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<QueryError> for MonitorError {
    fn from(err: QueryError) -> Self {
        MonitorError::Query(err)
    }
}

impl From<TimestampError> for MonitorError {
    fn from(err: TimestampError) -> Self {
        MonitorError::Timestamp(err)
    }
}
