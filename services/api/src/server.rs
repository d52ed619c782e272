use crate::cli::ServeArgs;
use crate::infra::{AppState, HealthSnapshot};
use crate::routes::with_validation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_ai::config::AppConfig;
use credit_ai::error::AppError;
use credit_ai::telemetry;
use credit_ai::workflows::validation::audit::InMemoryAuditStore;
use credit_ai::workflows::validation::reasoning::HttpReasoningClient;
use credit_ai::workflows::validation::service::CreditValidationService;
use credit_ai::workflows::validation::session::SessionStore;
use credit_ai::workflows::validation::upstream::PlatformClient;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        health: Arc::new(HealthSnapshot::from_config(&config)),
    };

    let session = Arc::new(SessionStore::new());
    let evidence = Arc::new(PlatformClient::new(config.upstream.clone(), session)?);
    let reasoning = HttpReasoningClient::new(config.reasoning.clone())?;
    let audit = Arc::new(InMemoryAuditStore::new());
    let validation_service = Arc::new(CreditValidationService::new(
        evidence,
        reasoning,
        config.reasoning.retry.clone(),
        audit,
        config.reasoning.model.clone(),
    ));

    let app = with_validation_routes(validation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "credit validation orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
