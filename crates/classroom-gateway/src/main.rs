use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use classroom_collab::{InstanceRegistry, SameClientMerger};
use classroom_core::ClassroomConfig;

mod app;
mod http;
mod ws;

/// Seed text for a document instance that has never been persisted — an
/// otherwise-empty document is indistinguishable from a corrupt load, so
/// new documents start with a non-empty paragraph of blank lines.
fn seed_document() -> String {
    "\n".repeat(15)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classroom_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("CLASSROOM_CONFIG").ok();
    let config = ClassroomConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        ClassroomConfig::default()
    });

    let store = classroom_store::Store::open(&config.database.path)?;
    let classroom_store::Store {
        lessons,
        namespaces,
        events,
        documents,
        metrics,
        mailer,
        auth,
    } = store;

    let lessons = Arc::new(lessons);
    let namespaces: Arc<dyn classroom_core::collaborators::NamespaceStore> = Arc::new(namespaces);
    let events = Arc::new(events);
    let documents: Arc<dyn classroom_core::collaborators::DocumentRecordStore> = Arc::new(documents);
    let metrics = Arc::new(metrics);
    let mailer = Arc::new(mailer);
    let auth: Arc<dyn classroom_core::collaborators::Auth> = Arc::new(auth);

    let instances = InstanceRegistry::with_max_instances(
        documents,
        Arc::new(seed_document),
        config.docs.max_instances,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = classroom_scheduler::SchedulerEngine::new(
        lessons,
        events,
        metrics,
        mailer,
        Arc::new(classroom_scheduler::SystemClock),
        config.scheduler.interval_secs,
    );
    tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let save_interval = config.docs.save_interval_secs;

    let state = Arc::new(app::AppState::new(config, instances, auth, namespaces));

    let save_state = state.clone();
    let mut save_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(save_interval));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match save_state.instances.save_dirty(&SameClientMerger).await {
                        Ok(n) if n > 0 => info!(count = n, "persisted dirty document instances"),
                        Ok(_) => {}
                        Err(e) => error!("document instance save sweep failed: {e}"),
                    }
                }
                _ = save_shutdown.changed() => {
                    if *save_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("classroom gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    let _ = shutdown_tx.send(true);
    serve_result?;
    Ok(())
}
