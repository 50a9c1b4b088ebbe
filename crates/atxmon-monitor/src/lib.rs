//! atxmon-monitor
//!
//! ATX publication check for one namespace of the test network.
//!
//! Pipeline: latest released layer -> epoch to monitor -> ATX events of that
//! epoch -> epoch wall-clock boundary from release ticks of its first and
//! last layer -> per-event window check + count check -> report.
//!
//! Validation failures are returned as values inside [`AtxCheckReport`];
//! the caller decides whether to print, exit, or retry.

mod boundary;
mod check;
mod error;
mod layers;
pub mod queries;

pub use boundary::EpochBoundary;
pub use check::{check_atx_publication, AtxCheckReport, AtxEventRow, ValidationFailure};
pub use error::MonitorError;
pub use layers::{EpochLayout, LAYERS_PER_EPOCH};
