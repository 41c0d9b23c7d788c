use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::authz::TcpAuthzClient;
use service::health::HttpHealthProber;
use service::manager::ServiceManager;

use crate::auth::AppState;
use crate::routes;
use crate::rpc;

const PROBE_TIMEOUT_MS: u64 = 3000;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Public entry: wire the application context and run both listeners.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_default();

    let cfg = configs::AppConfig::load_and_validate()?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;

    let authz = Arc::new(TcpAuthzClient::new(cfg.authz.addr.clone(), cfg.authz.timeout_ms));
    let prober = Arc::new(HttpHealthProber::new(PROBE_TIMEOUT_MS));
    let manager = Arc::new(ServiceManager::new(db, authz, prober));

    let state = AppState { manager: Arc::clone(&manager), jwt_secret: cfg.auth.jwt_secret.clone() };
    let app: Router = routes::build_router(build_cors(), state);

    let http_addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    let rpc_addr: SocketAddr = format!("{}:{}", cfg.rpc.host, cfg.rpc.port).parse()?;

    let http_listener = TcpListener::bind(http_addr).await?;
    let rpc_listener = TcpListener::bind(rpc_addr).await?;
    info!(%http_addr, %rpc_addr, "starting portal-server");

    tokio::select! {
        res = axum::serve(http_listener, app) => res?,
        res = rpc::serve(rpc_listener, manager) => res?,
    }
    Ok(())
}
