use crate::cli::ServeArgs;
use crate::infra::{build_service, demo_catalog, load_catalog, AppState};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use internship_allocation::config::AppConfig;
use internship_allocation::error::AppError;
use internship_allocation::telemetry;
use internship_allocation::workflows::placement::{MemoryCatalog, SystemClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let internships = match &config.placement.catalog_path {
        Some(path) => load_catalog(path)?,
        None => {
            warn!("CATALOG_PATH not set; serving the built-in sample catalog");
            demo_catalog(Utc::now())
        }
    };
    info!(internships = internships.len(), "catalog loaded");

    let service = build_service(
        MemoryCatalog::new(internships),
        &config.placement,
        Arc::new(SystemClock),
    )?;

    let app = with_placement_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "internship allocation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
