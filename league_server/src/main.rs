//! League server: bootstraps the database, applies the catalog and serves the API.
//!
//! Run from repo root: `cargo run -p league-server`

use league_manager::{
    apply_migrations, build_app, connect_pool, ensure_database_exists, load_catalog, resolve,
    seed_demo_data, AppState, Settings,
};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "league_manager=info,league_server=info,tower_http=info",
                )
            }),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = connect_pool(&settings).await?;

    let config = load_catalog()?;
    let model = resolve(&config)?;
    apply_migrations(&pool, &config).await?;
    if settings.seed_demo_data && seed_demo_data(&pool, &model).await? {
        tracing::info!("demo data loaded");
    }

    let bind_addr = settings.bind_addr.clone();
    let app = build_app(AppState::new(pool, model, settings));
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("league server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
