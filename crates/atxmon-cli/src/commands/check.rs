use anyhow::{Context as _, Result};
use atxmon_monitor::check_atx_publication;
use tracing::error;

use super::Context;

/// `atxmon check-atx <namespace> <expected_atx_count>`
///
/// Prints the full report to stdout before failing, so a red run still
/// leaves the epoch window and every event timestamp in the job log.
pub async fn run(ctx: &Context, namespace: String, expected_atx_count: u64) -> Result<()> {
    let client = ctx.client(namespace)?;

    let report = check_atx_publication(&client, ctx.layout, expected_atx_count)
        .await
        .with_context(|| {
            format!(
                "atx check aborted (namespace={} index={})",
                client.namespace(),
                client.index()
            )
        })?;

    println!("config_hash={}", ctx.config_hash);
    println!("{report}");

    if !report.passed() {
        error!(
            namespace = client.namespace(),
            epoch = report.epoch,
            failures = report.failures.len(),
            "atx check failed"
        );
    }
    report.into_result()?;
    Ok(())
}
