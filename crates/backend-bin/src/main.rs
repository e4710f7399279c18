use parlor_backend_lib::{app_router, config::Settings, storage::FlatFileStorage, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    tracing::info!(
        "starting with data dir {:?}, allowed origins {:?}",
        settings.data_dir,
        settings.allowed_origins
    );

    let storage = FlatFileStorage::new(&settings.data_dir)?;
    let bind_addr = settings.bind_addr;
    let state = Arc::new(AppState::new(storage, settings)?);
    let app = app_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
