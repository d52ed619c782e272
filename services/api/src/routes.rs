use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use credit_ai::error::AppError;
use credit_ai::workflows::validation::audit::{AuditId, AuditStore};
use credit_ai::workflows::validation::domain::{FailureKind, ValidationStatus};
use credit_ai::workflows::validation::reasoning::ReasoningClient;
use credit_ai::workflows::validation::service::CreditValidationService;
use credit_ai::workflows::validation::upstream::EvidenceSource;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidationRequest {
    pub(crate) transaction_id: String,
}

pub(crate) fn with_validation_routes<E, C, A>(
    service: Arc<CreditValidationService<E, C, A>>,
) -> axum::Router
where
    E: EvidenceSource + 'static,
    C: ReasoningClient + 'static,
    A: AuditStore + 'static,
{
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/validate", post(validate_endpoint::<E, C, A>))
        .route(
            "/api/v1/audit/:transaction_id",
            get(audit_trail_endpoint::<E, C, A>),
        )
        .route(
            "/api/v1/audit/record/:id",
            get(audit_record_endpoint::<E, C, A>),
        )
        .with_state(service)
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "collaborators": &*state.health }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Runs one validation. The business outcome is always a JSON body; the
/// HTTP status reflects the failure classification when the run fails.
pub(crate) async fn validate_endpoint<E, C, A>(
    State(service): State<Arc<CreditValidationService<E, C, A>>>,
    Json(request): Json<ValidationRequest>,
) -> impl IntoResponse
where
    E: EvidenceSource + 'static,
    C: ReasoningClient + 'static,
    A: AuditStore + 'static,
{
    let outcome = service.validate(&request.transaction_id).await;
    let status = match outcome.status {
        ValidationStatus::Success => StatusCode::OK,
        ValidationStatus::Error => failure_status(outcome.error_kind),
    };
    (status, Json(outcome))
}

pub(crate) async fn audit_trail_endpoint<E, C, A>(
    State(service): State<Arc<CreditValidationService<E, C, A>>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    E: EvidenceSource + 'static,
    C: ReasoningClient + 'static,
    A: AuditStore + 'static,
{
    let records = service.audit_store().list_by_transaction(&transaction_id)?;
    Ok(Json(json!({ "records": records })))
}

pub(crate) async fn audit_record_endpoint<E, C, A>(
    State(service): State<Arc<CreditValidationService<E, C, A>>>,
    Path(id): Path<AuditId>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError>
where
    E: EvidenceSource + 'static,
    C: ReasoningClient + 'static,
    A: AuditStore + 'static,
{
    let response = match service.audit_store().fetch(id)? {
        Some(record) => (StatusCode::OK, Json(json!({ "record": record }))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("audit record {id} not found") })),
        ),
    };
    Ok(response)
}

fn failure_status(kind: Option<FailureKind>) -> StatusCode {
    match kind {
        Some(FailureKind::ResourceNotFound) => StatusCode::NOT_FOUND,
        Some(FailureKind::EvidenceIncomplete) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(FailureKind::AuthenticationFailure | FailureKind::ReasoningServiceFailure) => {
            StatusCode::BAD_GATEWAY
        }
        Some(FailureKind::UnclassifiedFailure) | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{sample_bundle, CannedReasoningClient, FixtureEvidenceSource};
    use axum::body::Body;
    use axum::http::Request;
    use credit_ai::config::RetryConfig;
    use credit_ai::workflows::validation::audit::{
        AuditError, AuditRecord, InMemoryAuditStore,
    };
    use tower::ServiceExt;

    struct DownAuditStore;

    impl AuditStore for DownAuditStore {
        fn begin(&self, _record: AuditRecord) -> Result<AuditId, AuditError> {
            Err(AuditError::Unavailable("connection refused".to_string()))
        }

        fn update(&self, _id: AuditId, _record: &AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("connection refused".to_string()))
        }

        fn finalize(&self, _id: AuditId, _record: &AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("connection refused".to_string()))
        }

        fn list_by_transaction(
            &self,
            _transaction_id: &str,
        ) -> Result<Vec<AuditRecord>, AuditError> {
            Err(AuditError::Unavailable("connection refused".to_string()))
        }

        fn fetch(&self, _id: AuditId) -> Result<Option<AuditRecord>, AuditError> {
            Err(AuditError::Unavailable("connection refused".to_string()))
        }
    }

    fn fixture_router() -> axum::Router {
        let service = Arc::new(CreditValidationService::new(
            Arc::new(FixtureEvidenceSource::new(sample_bundle())),
            CannedReasoningClient::approving(),
            RetryConfig::default(),
            Arc::new(InMemoryAuditStore::new()),
            "fixture-model",
        ));
        with_validation_routes(service)
    }

    fn validate_request(transaction_id: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/validate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(
                "{{\"transactionId\":\"{transaction_id}\"}}"
            )))
            .expect("request builds")
    }

    #[tokio::test]
    async fn validate_route_returns_ok_for_a_clean_run() {
        let app = fixture_router();

        let response = app
            .oneshot(validate_request("txn-route"))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn audit_trail_route_lists_rows_after_a_run() {
        let app = fixture_router();

        let response = app
            .clone()
            .oneshot(validate_request("txn-audited"))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/audit/txn-audited")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn audit_trail_route_reports_an_unavailable_store() {
        let service = Arc::new(CreditValidationService::new(
            Arc::new(FixtureEvidenceSource::new(sample_bundle())),
            CannedReasoningClient::approving(),
            RetryConfig::default(),
            Arc::new(DownAuditStore),
            "fixture-model",
        ));
        let app = with_validation_routes(service);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/audit/txn-down")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn audit_record_route_reports_missing_rows() {
        let app = fixture_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/audit/record/999")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn failure_kinds_map_to_contractual_statuses() {
        assert_eq!(
            failure_status(Some(FailureKind::ResourceNotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            failure_status(Some(FailureKind::EvidenceIncomplete)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            failure_status(Some(FailureKind::AuthenticationFailure)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status(Some(FailureKind::ReasoningServiceFailure)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status(Some(FailureKind::UnclassifiedFailure)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
