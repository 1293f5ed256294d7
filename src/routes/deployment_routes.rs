use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::{DeploymentController, HistoryController};
use crate::dto::deployment_dto::{
    CreateDeploymentRequest, DeploymentResponse, ListDeploymentsQuery, TransitionDeploymentRequest,
    UpdateTelemetryRequest,
};
use crate::dto::history_dto::{
    HistoryResponse, MetricsResponse, RecordCommunicationRequest, RecordIncidentRequest,
    ResolveIncidentRequest,
};
use crate::dto::ApiResponse;
use crate::models::deployment::DeploymentStatus;
use crate::models::history::{CommunicationEntry, IncidentReport};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_deployment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_deployment))
        .route("/", get(list_deployments))
        .route("/:id", get(get_deployment))
        .route("/by-reference/:reference", get(get_deployment_by_reference))
        .route("/:id/transition", post(transition_deployment))
        .route("/:id/telemetry", post(update_telemetry))
        .route("/:id/history", get(get_history))
        .route("/:id/metrics", get(get_metrics))
        .route("/:id/incident", post(record_incident))
        .route("/:id/incident/:incident_id/resolve", patch(resolve_incident))
        .route("/:id/communication", post(record_communication))
}

async fn create_deployment(
    State(state): State<AppState>,
    Json(request): Json<CreateDeploymentRequest>,
) -> Result<Json<ApiResponse<DeploymentResponse>>, AppError> {
    let controller = DeploymentController::new(state.pool.clone(), state.config.clone());
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn list_deployments(
    State(state): State<AppState>,
    Query(query): Query<ListDeploymentsQuery>,
) -> Result<Json<ApiResponse<Vec<DeploymentResponse>>>, AppError> {
    let controller = DeploymentController::new(state.pool.clone(), state.config.clone());
    let response = controller.list(query).await?;
    Ok(Json(response))
}

async fn get_deployment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeploymentResponse>>, AppError> {
    let controller = DeploymentController::new(state.pool.clone(), state.config.clone());
    let response = controller.get(id).await?;
    Ok(Json(response))
}

async fn get_deployment_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<DeploymentResponse>>, AppError> {
    let controller = DeploymentController::new(state.pool.clone(), state.config.clone());
    let response = controller.get_by_reference(&reference).await?;
    Ok(Json(response))
}

async fn transition_deployment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionDeploymentRequest>,
) -> Result<Json<ApiResponse<DeploymentResponse>>, AppError> {
    let controller = DeploymentController::new(state.pool.clone(), state.config.clone());
    let response = controller.transition(id, request).await?;

    // Al dejar de estar en curso, el despliegue ya no recibe telemetría
    let still_running = response
        .data
        .as_ref()
        .map(|d| d.status == DeploymentStatus::InProgress)
        .unwrap_or(false);
    if !still_running {
        state.release_ingest_lock(id).await;
    }

    Ok(Json(response))
}

async fn update_telemetry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTelemetryRequest>,
) -> Result<Json<ApiResponse<DeploymentResponse>>, AppError> {
    // Pings concurrentes del mismo despliegue entran de a uno; los de
    // despliegues distintos no se esperan entre sí
    let lock = state.ingest_lock(id).await;
    let _guard = lock.lock().await;

    let controller = DeploymentController::new(state.pool.clone(), state.config.clone());
    match controller.update_telemetry(id, request).await {
        Ok(response) => Ok(Json(response)),
        // Un id desconocido o un despliegue que no está en curso no
        // deja entrada viva en el mapa de locks
        Err(e) => {
            state.release_ingest_lock(id).await;
            Err(e)
        }
    }
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HistoryResponse>>, AppError> {
    let controller = HistoryController::new(state.pool.clone(), state.config.clone());
    let response = controller.get_history(id).await?;
    Ok(Json(response))
}

async fn get_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MetricsResponse>>, AppError> {
    let controller = HistoryController::new(state.pool.clone(), state.config.clone());
    let response = controller.get_metrics(id).await?;
    Ok(Json(response))
}

async fn record_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordIncidentRequest>,
) -> Result<Json<ApiResponse<IncidentReport>>, AppError> {
    let controller = HistoryController::new(state.pool.clone(), state.config.clone());
    let response = controller.record_incident(id, request).await?;
    Ok(Json(response))
}

async fn resolve_incident(
    State(state): State<AppState>,
    Path((id, incident_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ResolveIncidentRequest>,
) -> Result<Json<ApiResponse<IncidentReport>>, AppError> {
    let controller = HistoryController::new(state.pool.clone(), state.config.clone());
    let response = controller.resolve_incident(id, incident_id, request).await?;
    Ok(Json(response))
}

async fn record_communication(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordCommunicationRequest>,
) -> Result<Json<ApiResponse<CommunicationEntry>>, AppError> {
    let controller = HistoryController::new(state.pool.clone(), state.config.clone());
    let response = controller.record_communication(id, request).await?;
    Ok(Json(response))
}
