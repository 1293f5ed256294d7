use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::deployment::{
    Deployment, DeploymentPriority, DeploymentPurpose, DeploymentStatus, TelemetrySnapshot,
};

/// Request para crear un despliegue. La referencia DEP_ la genera el
/// servidor, nunca viene del caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeploymentRequest {
    pub vehicle_id: Uuid,
    pub pilot_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    #[validate(length(min = 3, max = 255))]
    pub start_address: String,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    #[validate(length(min = 3, max = 255))]
    pub end_address: Option<String>,
    pub purpose: DeploymentPurpose,
    pub priority: Option<DeploymentPriority>,
    pub estimated_cost: Option<Decimal>,
}

// Request para transicionar el estado. El estado objetivo viene como
// string y se parsea: un valor desconocido es error de validación, no
// de transición.
#[derive(Debug, Deserialize, Validate)]
pub struct TransitionDeploymentRequest {
    pub target_status: String,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    /// Quién pidió el cambio; queda en el historial
    #[validate(length(max = 100))]
    pub actor: Option<String>,
    /// true cuando lo dispara un mecanismo externo (timeout), no un operador
    pub system_generated: Option<bool>,
}

/// Request de telemetría: actualiza el snapshot en vivo y agrega el ping
/// a la serie del historial en la misma operación
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTelemetryRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(range(min = 0.0, max = 400.0))]
    pub speed_kmh: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_level: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy_m: Option<f64>,
    pub altitude_m: Option<f64>,
    /// Hora del dispositivo; si falta, el servidor usa la suya
    pub recorded_at: Option<DateTime<Utc>>,
}

// Query params del listado
#[derive(Debug, Deserialize, Default)]
pub struct ListDeploymentsQuery {
    pub status: Option<String>,
    pub vehicle_id: Option<Uuid>,
    pub pilot_id: Option<Uuid>,
    pub overdue: Option<bool>,
}

/// Response de despliegue con los valores derivados calculados al momento
#[derive(Debug, Serialize)]
pub struct DeploymentResponse {
    pub id: Uuid,
    pub reference: String,
    pub vehicle_id: Uuid,
    pub pilot_id: Uuid,
    pub status: DeploymentStatus,
    pub purpose: DeploymentPurpose,
    pub priority: DeploymentPriority,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_address: String,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub end_address: Option<String>,
    pub telemetry: Option<TelemetrySnapshot>,
    pub end_reason: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub duration_minutes: i64,
    pub progress_percentage: f64,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Deployment> for DeploymentResponse {
    fn from(deployment: Deployment) -> Self {
        let duration_minutes = deployment.duration().num_minutes();
        let progress_percentage = deployment.progress_percentage();
        let is_overdue = deployment.is_overdue();

        Self {
            id: deployment.id,
            reference: deployment.reference,
            vehicle_id: deployment.vehicle_id,
            pilot_id: deployment.pilot_id,
            status: deployment.status,
            purpose: deployment.purpose,
            priority: deployment.priority,
            start_time: deployment.start_time,
            estimated_end_time: deployment.estimated_end_time,
            actual_end_time: deployment.actual_end_time,
            start_latitude: deployment.start_latitude,
            start_longitude: deployment.start_longitude,
            start_address: deployment.start_address,
            end_latitude: deployment.end_latitude,
            end_longitude: deployment.end_longitude,
            end_address: deployment.end_address,
            telemetry: deployment.telemetry.map(|json| json.0),
            end_reason: deployment.end_reason,
            estimated_cost: deployment.estimated_cost,
            actual_cost: deployment.actual_cost,
            duration_minutes,
            progress_percentage,
            is_overdue,
            created_at: deployment.created_at,
            updated_at: deployment.updated_at,
        }
    }
}
