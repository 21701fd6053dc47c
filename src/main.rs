use todo_sync::config::Settings;
use todo_sync::http::routes::todos;
use todo_sync::http::routing;
use todo_sync::infrastructure::memory_collection::MemoryCollection;
use tracing_subscriber::EnvFilter;

/// Serves an in-memory todo collection so the client can run against a local remote.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let collection = MemoryCollection::sample();
    let router = routing::app(todos::router(todos::AppState::new(collection)));

    let addr = settings.bind_addr;
    tracing::info!(%addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
