use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::history::{
    CommunicationEntry, CommunicationPriority, CommunicationType, DeploymentMetrics,
    IncidentReport, IncidentSeverity, IncidentType, LocationPing, StatusChangeEntry,
};

// Request para reportar un incidente
#[derive(Debug, Deserialize, Validate)]
pub struct RecordIncidentRequest {
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    #[validate(length(min = 3, max = 1000))]
    pub description: String,
    #[validate(length(max = 100))]
    pub reported_by: Option<String>,
    /// Hora del evento según el reportante; si falta, la del servidor
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResolveIncidentRequest {
    #[validate(length(max = 1000))]
    pub resolution_note: Option<String>,
}

// Request para registrar una comunicación operador-piloto
#[derive(Debug, Deserialize, Validate)]
pub struct RecordCommunicationRequest {
    pub comm_type: CommunicationType,
    pub priority: Option<CommunicationPriority>,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[validate(length(max = 100))]
    pub sender: Option<String>,
    #[validate(length(max = 100))]
    pub recipient: Option<String>,
}

/// Historial completo de un despliegue: shell con calidad de datos más
/// las cuatro series append-only en orden cronológico
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub deployment_id: Uuid,
    pub ping_count: i64,
    pub accuracy_samples: i64,
    pub average_accuracy_m: Option<f64>,
    pub gap_count: i64,
    pub last_ping_at: Option<DateTime<Utc>>,
    pub status_changes: Vec<StatusChangeEntry>,
    pub pings: Vec<LocationPing>,
    pub incidents: Vec<IncidentReport>,
    pub communications: Vec<CommunicationEntry>,
}

/// Las métricas con menos de 2 pings no existen: la respuesta lo dice
/// explícitamente en vez de devolver ceros
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DeploymentMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MetricsResponse {
    pub fn available(metrics: DeploymentMetrics) -> Self {
        Self {
            available: true,
            metrics: Some(metrics),
            reason: None,
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            available: false,
            metrics: None,
            reason: Some(reason.to_string()),
        }
    }
}
