//! Domain questions expressed as field filters.
//!
//! One [`QueryClient`] is scoped to one namespace, so the namespace is
//! implicit here. Nothing in this module parses or checks timestamps.

use atxmon_query::{Fields, LogRecord, QueryClient};

use crate::error::MonitorError;

/// `M` of the event a node logs when it releases a layer.
pub const MSG_RELEASE_TICK: &str = "release tick";
/// `M` of the event a node logs when it publishes its ATX.
pub const MSG_ATX_PUBLISHED: &str = "atx published";

fn release_tick_filter(layer_id: Option<u64>) -> Fields {
    let f = Fields::new().with("M", MSG_RELEASE_TICK);
    match layer_id {
        Some(l) => f.with("layer_id", l),
        None => f,
    }
}

fn atx_published_filter(epoch_id: u64) -> Fields {
    Fields::new()
        .with("M", MSG_ATX_PUBLISHED)
        .with("epoch_id", epoch_id)
}

/// Most recent release tick: `(layer_id, raw T)`.
pub async fn latest_released_layer(client: &QueryClient) -> Result<(u64, String), MonitorError> {
    let hit = client.get_latest(&release_tick_filter(None)).await?;
    let layer = hit.layer_id.ok_or_else(|| MonitorError::MissingField {
        field: "layer_id",
        record: hit.source.to_string(),
    })?;
    Ok((layer, hit.timestamp))
}

/// Release ticks for one layer, or for every layer when `layer_id` is `None`.
/// Ascending on `T`.
pub async fn layer_release_ticks(
    client: &QueryClient,
    layer_id: Option<u64>,
) -> Result<Vec<LogRecord>, MonitorError> {
    Ok(client.get_all(&release_tick_filter(layer_id)).await?)
}

pub async fn count_atx_published(client: &QueryClient, epoch_id: u64) -> Result<u64, MonitorError> {
    Ok(client.count(&atx_published_filter(epoch_id)).await?)
}

/// ATX publication events scoped to `epoch_id`, ascending on `T`.
pub async fn atx_published_events(
    client: &QueryClient,
    epoch_id: u64,
) -> Result<Vec<LogRecord>, MonitorError> {
    Ok(client.get_all(&atx_published_filter(epoch_id)).await?)
}
