//! Read-only diagnostic commands over the same domain queries the check uses.

use anyhow::Result;
use atxmon_monitor::queries;

use super::Context;

/// `atxmon latest-layer <namespace>`
pub async fn latest_layer(ctx: &Context, namespace: String) -> Result<()> {
    let client = ctx.client(namespace)?;
    let (layer, t) = queries::latest_released_layer(&client).await?;
    println!("latest_layer={} T={}", layer, t);
    println!("epoch={}", ctx.layout.epoch_of(layer));
    match ctx.layout.epoch_to_monitor(layer) {
        Some(e) => println!("epoch_to_monitor={}", e),
        None => println!("epoch_to_monitor="),
    }
    Ok(())
}

/// `atxmon layer-ticks <namespace> [--layer N]`
pub async fn layer_ticks(ctx: &Context, namespace: String, layer: Option<u64>) -> Result<()> {
    let client = ctx.client(namespace)?;
    let ticks = queries::layer_release_ticks(&client, layer).await?;
    for t in &ticks {
        let node = t
            .field("kubernetes.pod_name")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        println!(
            "layer_id={} T={} node={}",
            t.layer_id.map(|l| l.to_string()).unwrap_or_default(),
            t.timestamp,
            node
        );
    }
    println!("ticks={}", ticks.len());
    Ok(())
}

/// `atxmon count-atx <namespace> <epoch>`
pub async fn count_atx(ctx: &Context, namespace: String, epoch: u64) -> Result<()> {
    let client = ctx.client(namespace)?;
    let n = queries::count_atx_published(&client, epoch).await?;
    println!("epoch={} atx_published={}", epoch, n);
    Ok(())
}
