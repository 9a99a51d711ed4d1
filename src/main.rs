use anyhow::Result;
use tracing::info;

mod api;
mod app_state;
mod config;
mod core;
mod domain;
mod errors;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = config::load_settings()?;
    let app = routes::app_router(&settings);
    let state = app_state::build_app_state(settings.clone())?;

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("clusterlens backend listening on {}", addr);

    axum::serve(listener, app.with_state(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .try_init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
