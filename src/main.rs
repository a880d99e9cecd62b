use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{trace::TraceLayer, cors::{Any, CorsLayer}};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lessonflow_runtime::{
    catalog::{CatalogSource, FileCatalogSource, HttpCatalogSource},
    config::Config,
    db,
    progress::SystemClock,
    repository::{JsonFileProgressRepository, PgProgressRepository, ProgressRepository},
    routes,
    session::LearningSession,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lessonflow_runtime=info,axum=info".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let source: Arc<dyn CatalogSource> = match &config.catalog_url {
        Some(url) => {
            tracing::info!(%url, "using remote catalog");
            Arc::new(HttpCatalogSource::new(url.clone()))
        }
        None => {
            tracing::info!(dir = %config.data_dir.display(), "using local catalog");
            Arc::new(FileCatalogSource::new(config.data_dir.clone()))
        }
    };

    let repo: Arc<dyn ProgressRepository> = match &config.database_url {
        Some(url) => Arc::new(PgProgressRepository::new(db::connect(url).await?)),
        None => {
            tracing::info!(file = %config.progress_file.display(), "persisting progress to file");
            Arc::new(JsonFileProgressRepository::new(config.progress_file.clone()))
        }
    };

    let session = Arc::new(LearningSession::start(source, repo, Arc::new(SystemClock)).await);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(session, config.media_dir()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
