use anyhow::{Context, Result};
use bhml_admin::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let state = AppState::from_config(&config)
        .with_context(|| format!("opening site root {}", config.site_root.display()))?;
    let app = build_router(state, config.upload_limit);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    log::info!(
        "serving {} (data in {}) on http://{}",
        config.site_root.display(),
        config.data_dir.display(),
        config.bind
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("could not listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
