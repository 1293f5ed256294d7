//! Modelo de historial de despliegues
//!
//! El historial es un shell por despliegue (una fila en deployment_history)
//! más tablas hijas append-only: cambios de estado, pings de ubicación,
//! incidentes y comunicaciones. El shell acumula contadores de calidad de
//! datos que se actualizan de forma incremental con cada ping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::deployment::DeploymentStatus;

/// Shell de historial - mapea a la tabla deployment_history.
/// Se crea de forma perezosa en la primera escritura, así que ningún
/// registrador falla por historial ausente.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeploymentHistory {
    pub deployment_id: Uuid,
    pub ping_count: i64,
    /// Cantidad de pings que traían accuracy, para la media incremental
    pub accuracy_samples: i64,
    pub average_accuracy_m: Option<f64>,
    /// Huecos de telemetría detectados (separación mayor al umbral)
    pub gap_count: i64,
    pub last_ping_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cambio de estado registrado - mapea a deployment_status_changes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusChangeEntry {
    pub id: Uuid,
    pub deployment_id: Uuid,
    /// None en la entrada inicial de creación
    pub from_status: Option<DeploymentStatus>,
    pub to_status: DeploymentStatus,
    pub changed_by: Option<String>,
    pub reason: Option<String>,
    /// true cuando lo escribe el propio ciclo de vida, false si es manual
    pub system_generated: bool,
    /// Hora del servidor, nunca la del dispositivo
    pub created_at: DateTime<Utc>,
}

/// Ping de ubicación - mapea a deployment_location_pings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationPing {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub accuracy_m: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub battery_level: Option<f64>,
    pub altitude_m: Option<f64>,
    /// Hora del dispositivo; si no viene, el servidor pone la suya
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Tipo de incidente - mapea al ENUM incident_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "incident_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Collision,
    Breakdown,
    BatteryCritical,
    RouteDeviation,
    Weather,
    Other,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collision => "collision",
            Self::Breakdown => "breakdown",
            Self::BatteryCritical => "battery_critical",
            Self::RouteDeviation => "route_deviation",
            Self::Weather => "weather",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "collision" => Ok(Self::Collision),
            "breakdown" => Ok(Self::Breakdown),
            "battery_critical" => Ok(Self::BatteryCritical),
            "route_deviation" => Ok(Self::RouteDeviation),
            "weather" => Ok(Self::Weather),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown incident type '{}'", other)),
        }
    }
}

/// Severidad de incidente - mapea al ENUM incident_severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "incident_severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentSeverity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown incident severity '{}'", other)),
        }
    }
}

/// Incidente reportado - mapea a deployment_incidents
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IncidentReport {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub description: String,
    pub reported_by: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tipo de comunicación - mapea al ENUM communication_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "communication_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommunicationType {
    Instruction,
    StatusReport,
    Alert,
    Note,
}

/// Prioridad de comunicación - mapea al ENUM communication_priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "communication_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommunicationPriority {
    Normal,
    Urgent,
}

impl Default for CommunicationPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Comunicación operador-piloto - mapea a deployment_communications
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommunicationEntry {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub comm_type: CommunicationType,
    pub priority: CommunicationPriority,
    pub message: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Métricas derivadas de la serie de pings. Siempre se calculan bajo
/// demanda, nunca se persisten; con menos de 2 pings no hay métricas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentMetrics {
    pub total_distance_km: f64,
    pub max_speed_kmh: f64,
    /// Media de los pings que reportan velocidad
    pub average_speed_kmh: f64,
    pub battery_start: Option<f64>,
    pub battery_end: Option<f64>,
    /// Acotado a >= 0; una recarga a mitad de viaje reporta 0 y anomalía
    pub battery_used: f64,
    pub battery_anomaly: bool,
    /// None cuando no se consumió batería
    pub energy_efficiency_km_per_pct: Option<f64>,
    pub carbon_saved_kg: f64,
    pub total_duration_minutes: i64,
    pub ping_count: i64,
    pub average_accuracy_m: Option<f64>,
    pub gap_count: i64,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_type_from_str() {
        assert_eq!("battery_critical".parse::<IncidentType>().unwrap(), IncidentType::BatteryCritical);
        assert_eq!("route_deviation".parse::<IncidentType>().unwrap(), IncidentType::RouteDeviation);
        assert!("explosion".parse::<IncidentType>().is_err());
    }

    #[test]
    fn test_incident_severity_ordering() {
        assert!(IncidentSeverity::Critical > IncidentSeverity::High);
        assert!(IncidentSeverity::High > IncidentSeverity::Medium);
        assert!(IncidentSeverity::Medium > IncidentSeverity::Low);
    }

    #[test]
    fn test_communication_priority_default() {
        assert_eq!(CommunicationPriority::default(), CommunicationPriority::Normal);
    }
}
