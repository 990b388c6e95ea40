//! Noticeboard backend — HTTP API + Web Push broadcast.
//!
//! Required env: VAPID_PRIVATE_KEY
//! Optional: HOST, PORT, DATABASE_PATH, VAPID_SUBJECT, CORS_ORIGINS

use std::net::SocketAddr;
use std::sync::Arc;

use noticeboard::{api, config, db, push};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    let config = Arc::new(config);

    let db = db::Db::open(&config.database_path)?;
    db.run_migrations()?;
    let db = Arc::new(db);

    let vapid = push::VapidConfig {
        subject: config.vapid_subject.clone(),
        private_key: config.vapid_private_key.clone(),
    };
    let transport = Arc::new(push::WebPushTransport::new(vapid));
    let dispatcher = Arc::new(push::Dispatcher::new(db.clone(), transport));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid bind address");

    let state = api::AppState {
        db,
        dispatcher,
        config,
    };

    let app = api::router(state);

    tracing::info!("Noticeboard backend listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
