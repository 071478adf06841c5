use anyhow::Context;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use tms::api_router::build_router;
use tms::cache::{Cache, MemoryCache, RedisCache};
use tms::config::AppConfig;
use tms::drive::S3Storage;
use tms::notifications::{
    parse_schedule, run_report_schedule, run_worker, NotificationDispatcher, NotificationQueue,
    SmtpMailer,
};
use tms::search::PgSearchIndex;
use tms::shared::state::AppState;
use tms::shared::utils::{create_conn, run_migrations};
use tms::store::PgStore;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
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
    info!("Shutdown signal received");
}

async fn select_cache(config: &AppConfig) -> Arc<dyn Cache> {
    match config.cache.redis_url.as_deref() {
        Some(url) => match RedisCache::open(url).await {
            Ok(cache) => {
                info!("Using Redis cache at {url}");
                Arc::new(cache)
            }
            Err(e) => {
                warn!("Failed to connect to Redis, using in-process cache: {e}");
                Arc::new(MemoryCache::new())
            }
        },
        None => {
            info!("No Redis URL configured, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::load()?;

    let pool = create_conn(&config.database).context("Database pool creation failed")?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
    info!("Database ready");

    let store = Arc::new(PgStore::new(pool.clone()));
    let index = Arc::new(PgSearchIndex::new(pool));
    let cache = select_cache(&config).await;
    let storage = Arc::new(S3Storage::connect(&config.drive).await);
    let mailer = Arc::new(SmtpMailer::new(config.email.clone()));

    let (queue, jobs) = NotificationQueue::channel();
    let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), mailer));
    tokio::spawn(run_worker(jobs, dispatcher, config.notifications.workers));

    let schedule = parse_schedule(&config.notifications.report_cron)?;
    tokio::spawn(run_report_schedule(schedule, queue.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let state = Arc::new(AppState::new(config, store, cache, index, storage, queue)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
