//! Modelo de mantenimiento de vehículos
//!
//! Ventanas de mantenimiento programadas que reservan al vehículo igual
//! que los despliegues, pero con pool propio. El ciclo de vida también
//! es propio (con delayed/failed y reactivación desde cancelled) y no
//! comparte tabla de transiciones con los despliegues.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Estado del mantenimiento - mapea al ENUM maintenance_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Delayed,
    Failed,
}

impl MaintenanceStatus {
    /// Solo `completed` cierra el ciclo: un cancelado puede reactivarse
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Estados que reservan la ventana del vehículo
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress | Self::Delayed)
    }

    /// Tabla de transiciones válidas del ciclo de mantenimiento
    pub fn can_transition_to(&self, next: MaintenanceStatus) -> bool {
        match (self, next) {
            (Self::Scheduled, Self::InProgress) => true,
            (Self::Scheduled, Self::Delayed) => true,
            (Self::Scheduled, Self::Cancelled) => true,
            (Self::Delayed, Self::Scheduled) => true,
            (Self::Delayed, Self::InProgress) => true,
            (Self::Delayed, Self::Cancelled) => true,
            (Self::InProgress, Self::Completed) => true,
            (Self::InProgress, Self::Failed) => true,
            (Self::InProgress, Self::Cancelled) => true,
            (Self::Failed, Self::Scheduled) => true,
            (Self::Failed, Self::Cancelled) => true,
            (Self::Cancelled, Self::Scheduled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Delayed => "delayed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaintenanceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "delayed" => Ok(Self::Delayed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown maintenance status '{}'", other)),
        }
    }
}

/// Tipo de mantenimiento - mapea al ENUM maintenance_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "maintenance_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    RoutineInspection,
    BatteryService,
    TireService,
    BrakeService,
    SoftwareUpdate,
    Repair,
}

impl FromStr for MaintenanceType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "routine_inspection" => Ok(Self::RoutineInspection),
            "battery_service" => Ok(Self::BatteryService),
            "tire_service" => Ok(Self::TireService),
            "brake_service" => Ok(Self::BrakeService),
            "software_update" => Ok(Self::SoftwareUpdate),
            "repair" => Ok(Self::Repair),
            other => Err(format!("unknown maintenance type '{}'", other)),
        }
    }
}

/// Prioridad del mantenimiento - mapea al ENUM maintenance_priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "maintenance_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for MaintenancePriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Pieza reemplazada durante el servicio, guardada en columna JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartReplaced {
    pub name: String,
    pub part_number: Option<String>,
    pub cost: Option<Decimal>,
}

/// Resultado de un chequeo de diagnóstico, guardado en columna JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticResult {
    pub check: String,
    pub outcome: String,
    pub reading: Option<String>,
}

/// Registro de mantenimiento - mapea a la tabla vehicle_maintenance_logs.
/// La ventana `[unavailable_from, unavailable_to)` es la que compite en
/// el pool de mantenimiento del vehículo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceLog {
    pub id: Uuid,
    /// Referencia legible `MAINT_YYMMDD_###`, generada por el servidor
    pub reference: String,
    pub vehicle_id: Uuid,
    pub maintenance_type: MaintenanceType,
    pub priority: MaintenancePriority,
    pub scheduled_date: NaiveDate,
    pub unavailable_from: DateTime<Utc>,
    pub unavailable_to: DateTime<Utc>,
    pub status: MaintenanceStatus,
    pub description: String,
    pub parts_replaced: Option<Json<Vec<PartReplaced>>>,
    pub diagnostics: Option<Json<Vec<DiagnosticResult>>>,
    pub quality_check_passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_and_active() {
        assert!(MaintenanceStatus::Completed.is_terminal());
        assert!(!MaintenanceStatus::Cancelled.is_terminal());
        assert!(!MaintenanceStatus::Failed.is_terminal());

        assert!(MaintenanceStatus::Scheduled.is_active());
        assert!(MaintenanceStatus::InProgress.is_active());
        assert!(MaintenanceStatus::Delayed.is_active());
        assert!(!MaintenanceStatus::Completed.is_active());
        assert!(!MaintenanceStatus::Cancelled.is_active());
        assert!(!MaintenanceStatus::Failed.is_active());
    }

    #[test]
    fn test_status_transitions_valid() {
        use MaintenanceStatus::*;

        assert!(Scheduled.can_transition_to(InProgress));
        assert!(Scheduled.can_transition_to(Delayed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Delayed.can_transition_to(Scheduled));
        assert!(Delayed.can_transition_to(InProgress));
        assert!(Delayed.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(Failed.can_transition_to(Scheduled));
        assert!(Failed.can_transition_to(Cancelled));

        // Un mantenimiento cancelado puede reprogramarse
        assert!(Cancelled.can_transition_to(Scheduled));
    }

    #[test]
    fn test_status_transitions_invalid() {
        use MaintenanceStatus::*;

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Scheduled.can_transition_to(Failed));
        assert!(!Delayed.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Cancelled.can_transition_to(InProgress));

        // `completed` no tiene salidas
        for target in [Scheduled, InProgress, Completed, Cancelled, Delayed, Failed] {
            assert!(!Completed.can_transition_to(target));
        }

        for status in [Scheduled, InProgress, Completed, Cancelled, Delayed, Failed] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_maintenance_type_from_str() {
        assert_eq!(
            "battery_service".parse::<MaintenanceType>().unwrap(),
            MaintenanceType::BatteryService
        );
        assert!("oil_change".parse::<MaintenanceType>().is_err());
    }

    #[test]
    fn test_priority_default() {
        assert_eq!(MaintenancePriority::default(), MaintenancePriority::Normal);
    }
}
