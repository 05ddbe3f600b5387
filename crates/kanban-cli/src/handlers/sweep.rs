use crate::context::CliContext;
use crate::output;
use kanban_domain::spawn_configured_sweeper;

pub async fn handle(ctx: &CliContext, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let reports = ctx.engine.sweep().await?;
        output::output_list(reports);
        return Ok(());
    }

    let handle = spawn_configured_sweeper(&ctx.engine).ok_or_else(|| {
        anyhow::anyhow!("--watch needs sweep_interval_secs in the [engine] config table")
    })?;
    tracing::info!("sweeping until interrupted");
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;

    output::output_success(serde_json::json!({ "stopped": true }));
    Ok(())
}
