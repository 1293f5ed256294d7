use crate::config::EnvironmentConfig;
use crate::dto::history_dto::{
    HistoryResponse, MetricsResponse, RecordCommunicationRequest, RecordIncidentRequest,
    ResolveIncidentRequest,
};
use crate::dto::ApiResponse;
use crate::models::history::{CommunicationEntry, IncidentReport, IncidentSeverity};
use crate::repositories::deployment_repository::DeploymentRepository;
use crate::repositories::history_repository::HistoryRepository;
use crate::services::geo_metrics::compute_metrics;
use crate::utils::errors::{not_found_error, AppError};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub struct HistoryController {
    deployments: DeploymentRepository,
    history: HistoryRepository,
    config: EnvironmentConfig,
}

impl HistoryController {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self {
            deployments: DeploymentRepository::new(pool.clone()),
            history: HistoryRepository::new(pool),
            config,
        }
    }

    pub async fn record_incident(
        &self,
        deployment_id: Uuid,
        request: RecordIncidentRequest,
    ) -> Result<ApiResponse<IncidentReport>, AppError> {
        request.validate()?;
        self.require_deployment(deployment_id).await?;

        let incident = self
            .history
            .append_incident(
                deployment_id,
                request.incident_type,
                request.severity,
                request.description,
                request.reported_by,
                request.occurred_at,
            )
            .await?;

        if incident.severity >= IncidentSeverity::High {
            log::warn!(
                "🚨 Incidente {} ({}) en despliegue {}",
                incident.incident_type,
                incident.severity,
                deployment_id
            );
        } else {
            log::info!(
                "🚨 Incidente {} registrado en despliegue {}",
                incident.incident_type,
                deployment_id
            );
        }

        Ok(ApiResponse::success_with_message(
            incident,
            "Incident recorded successfully".to_string(),
        ))
    }

    pub async fn resolve_incident(
        &self,
        deployment_id: Uuid,
        incident_id: Uuid,
        request: ResolveIncidentRequest,
    ) -> Result<ApiResponse<IncidentReport>, AppError> {
        request.validate()?;
        self.require_deployment(deployment_id).await?;

        let incident = self
            .history
            .resolve_incident(deployment_id, incident_id, request.resolution_note)
            .await?;

        log::info!("✅ Incidente {} resuelto", incident.id);

        Ok(ApiResponse::success_with_message(
            incident,
            "Incident resolved successfully".to_string(),
        ))
    }

    pub async fn record_communication(
        &self,
        deployment_id: Uuid,
        request: RecordCommunicationRequest,
    ) -> Result<ApiResponse<CommunicationEntry>, AppError> {
        request.validate()?;
        self.require_deployment(deployment_id).await?;

        let entry = self
            .history
            .append_communication(
                deployment_id,
                request.comm_type,
                request.priority.unwrap_or_default(),
                request.message,
                request.sender,
                request.recipient,
            )
            .await?;

        log::info!("💬 Comunicación registrada en despliegue {}", deployment_id);

        Ok(ApiResponse::success(entry))
    }

    /// Historial completo. Un despliegue sin escrituras todavía devuelve
    /// el historial vacío: la lectura nunca crea el shell.
    pub async fn get_history(
        &self,
        deployment_id: Uuid,
    ) -> Result<ApiResponse<HistoryResponse>, AppError> {
        self.require_deployment(deployment_id).await?;

        let shell = self.history.get_shell(deployment_id).await?;

        let response = match shell {
            Some(shell) => {
                let (status_changes, pings, incidents, communications) = futures::try_join!(
                    self.history.find_status_changes(deployment_id),
                    self.history.find_pings(deployment_id),
                    self.history.find_incidents(deployment_id),
                    self.history.find_communications(deployment_id),
                )?;

                HistoryResponse {
                    deployment_id,
                    ping_count: shell.ping_count,
                    accuracy_samples: shell.accuracy_samples,
                    average_accuracy_m: shell.average_accuracy_m,
                    gap_count: shell.gap_count,
                    last_ping_at: shell.last_ping_at,
                    status_changes,
                    pings,
                    incidents,
                    communications,
                }
            }
            None => HistoryResponse {
                deployment_id,
                ping_count: 0,
                accuracy_samples: 0,
                average_accuracy_m: None,
                gap_count: 0,
                last_ping_at: None,
                status_changes: vec![],
                pings: vec![],
                incidents: vec![],
                communications: vec![],
            },
        };

        Ok(ApiResponse::success(response))
    }

    /// Métricas derivadas de la serie de pings, calculadas al momento
    pub async fn get_metrics(
        &self,
        deployment_id: Uuid,
    ) -> Result<ApiResponse<MetricsResponse>, AppError> {
        self.require_deployment(deployment_id).await?;

        let pings = self.history.find_pings(deployment_id).await?;

        let response = match compute_metrics(
            &pings,
            self.config.carbon_factor_kg_per_km,
            self.config.telemetry_gap_minutes,
        ) {
            Some(metrics) => MetricsResponse::available(metrics),
            None => MetricsResponse::unavailable(
                "at least 2 location pings are required to compute metrics",
            ),
        };

        Ok(ApiResponse::success(response))
    }

    async fn require_deployment(&self, id: Uuid) -> Result<(), AppError> {
        self.deployments
            .find_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| not_found_error("Deployment", &id.to_string()))
    }
}
