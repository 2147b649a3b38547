use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slidecast_server::{router, AppState, Exporter, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.listen_addr()?;
    let export = config.export()?;

    let engine = config.engine();
    match engine.version().await {
        Ok(version) => tracing::info!(%version, "render engine found"),
        Err(e) => tracing::warn!(error = %e, "render engine unavailable, exports will fail"),
    }
    if !export.render.font_path.is_file() {
        tracing::warn!(font = %export.render.font_path.display(), "caption font not found");
    }

    std::fs::create_dir_all(&export.temp_root)
        .with_context(|| format!("creating temp root {}", export.temp_root.display()))?;
    tracing::info!(
        temp_root = %export.temp_root.display(),
        base_url = export.base_url.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        width = export.render.width,
        height = export.render.height,
        segment_seconds = export.render.segment_seconds,
        "export settings"
    );

    let exporter = Exporter::new(export, config.fetch(), Arc::new(engine))?;
    let app = router(AppState::new(exporter));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "slidecast server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
