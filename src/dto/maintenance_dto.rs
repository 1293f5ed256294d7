use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::maintenance::{
    DiagnosticResult, MaintenanceLog, MaintenancePriority, MaintenanceStatus, MaintenanceType,
    PartReplaced,
};

// Request para programar una ventana de mantenimiento
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaintenanceRequest {
    pub vehicle_id: Uuid,
    pub maintenance_type: MaintenanceType,
    pub priority: Option<MaintenancePriority>,
    pub unavailable_from: DateTime<Utc>,
    pub unavailable_to: DateTime<Utc>,
    #[validate(length(min = 3, max = 1000))]
    pub description: String,
}

// Request para transicionar el estado. Los detalles de cierre (piezas,
// diagnósticos, control de calidad) solo tienen sentido al completar.
#[derive(Debug, Deserialize, Validate)]
pub struct TransitionMaintenanceRequest {
    pub target_status: String,
    pub quality_check_passed: Option<bool>,
    pub parts_replaced: Option<Vec<PartReplaced>>,
    pub diagnostics: Option<Vec<DiagnosticResult>>,
}

// Query params del listado
#[derive(Debug, Deserialize, Default)]
pub struct ListMaintenanceQuery {
    pub status: Option<String>,
    pub vehicle_id: Option<Uuid>,
}

/// Response de mantenimiento
#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub id: Uuid,
    pub reference: String,
    pub vehicle_id: Uuid,
    pub maintenance_type: MaintenanceType,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub scheduled_date: NaiveDate,
    pub unavailable_from: DateTime<Utc>,
    pub unavailable_to: DateTime<Utc>,
    pub description: String,
    pub parts_replaced: Option<Vec<PartReplaced>>,
    pub diagnostics: Option<Vec<DiagnosticResult>>,
    pub quality_check_passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MaintenanceLog> for MaintenanceResponse {
    fn from(log: MaintenanceLog) -> Self {
        Self {
            id: log.id,
            reference: log.reference,
            vehicle_id: log.vehicle_id,
            maintenance_type: log.maintenance_type,
            priority: log.priority,
            status: log.status,
            scheduled_date: log.scheduled_date,
            unavailable_from: log.unavailable_from,
            unavailable_to: log.unavailable_to,
            description: log.description,
            parts_replaced: log.parts_replaced.map(|json| json.0),
            diagnostics: log.diagnostics.map(|json| json.0),
            quality_check_passed: log.quality_check_passed,
            completed_at: log.completed_at,
            created_at: log.created_at,
            updated_at: log.updated_at,
        }
    }
}
