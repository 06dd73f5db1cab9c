//! StudyGroups server
//!
//! Main application entry point

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tracing::{error, info, warn};

use StudyGroups::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService},
    handlers::router,
    services::{AuthService, GroupFeed, RedisService, ServiceFactory},
    state::{AppState, LoginFlowStorage},
    utils::logging,
};

const LISTENER_RETRY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate()?;

    // Initialize logging
    let _guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", StudyGroups::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;
    run_migrations(&pool).await?;
    let database = DatabaseService::new(pool);

    // Initialize Redis-backed state
    let redis = RedisService::new(settings.redis.clone())?;
    let flows = LoginFlowStorage::redis(redis.clone(), settings.auth.login_flow_ttl_seconds);

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, database.clone(), flows, Some(redis))?;

    if settings.features.realtime {
        spawn_change_listener(
            services.feed.clone(),
            database.clone(),
            Duration::from_millis(settings.search.debounce_ms),
        );
    }

    let cleanup_interval = Duration::from_secs(settings.cleanup.interval_seconds.max(1));
    if settings.features.cleanup_job {
        spawn_cleanup_job(database.clone(), cleanup_interval);
    }
    spawn_pruning_job(services.auth.clone(), cleanup_interval);

    let address = settings.bind_address();
    let app = router(AppState::new(settings, database, services));

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("StudyGroups server has been shut down.");
    Ok(())
}

/// Keep a change listener running, reconnecting after failures
fn spawn_change_listener(feed: GroupFeed, database: DatabaseService, debounce: Duration) {
    tokio::spawn(async move {
        loop {
            let pool = database.pool().clone();
            if let Err(e) = feed.clone().run_listener(pool, debounce).await {
                error!(error = %e, "Change listener stopped, reconnecting");
            }
            tokio::time::sleep(LISTENER_RETRY).await;
        }
    });
}

/// Periodically delete groups past their expiry
fn spawn_cleanup_job(database: DatabaseService, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match database.cleanup_expired_data().await {
                Ok(result) => info!(result = %result, "Expired study groups cleaned up"),
                Err(e) => warn!(error = %e, "Cleanup of expired study groups failed"),
            }
        }
    });
}

/// Periodically forget abandoned login flows and idle rate limit keys
fn spawn_pruning_job(auth: AuthService, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            auth.prune_idle_state().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
