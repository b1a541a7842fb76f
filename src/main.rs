use std::net::TcpListener;

use anyhow::Context;
use artgallery::{init_db, make_app, media::media_store_from_config, run_app, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artgallery=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = serve().await {
        tracing::error!(error = ?error, "server stopped");
        std::process::exit(1);
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = init_db(&config).await?;
    let media = media_store_from_config(&config)?;

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).with_context(|| format!("Could not bind {addr}"))?;
    let app = make_app(AppState {
        pool,
        config,
        media,
    })?;

    tracing::info!("Server started on {}", addr);
    run_app(app, listener).await
}
