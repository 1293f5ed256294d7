//! Modelo de Deployment
//!
//! Este módulo contiene el struct Deployment, sus enums de estado y la
//! tabla de transiciones del ciclo de vida. Los valores derivados
//! (duración, progreso, atraso) se calculan siempre, nunca se almacenan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Estado del despliegue - mapea al ENUM deployment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "deployment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    EmergencyStop,
}

impl DeploymentStatus {
    /// Estados terminales: sin transiciones de salida
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Estados que reservan la ventana del vehículo y del piloto.
    /// `emergency_stop` no es terminal, así que sigue ocupando la ventana.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Solo un despliegue en curso emite telemetría
    pub fn accepts_telemetry(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Tabla de transiciones válidas del ciclo de vida
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        match (self, next) {
            (Self::Scheduled, Self::InProgress) => true,
            (Self::Scheduled, Self::Cancelled) => true,
            (Self::InProgress, Self::Completed) => true,
            (Self::InProgress, Self::EmergencyStop) => true,
            (Self::InProgress, Self::Cancelled) => true,
            (Self::EmergencyStop, Self::Completed) => true,
            (Self::EmergencyStop, Self::Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::EmergencyStop => "emergency_stop",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "emergency_stop" => Ok(Self::EmergencyStop),
            other => Err(format!("unknown deployment status '{}'", other)),
        }
    }
}

/// Propósito del despliegue - mapea al ENUM deployment_purpose
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "deployment_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPurpose {
    Delivery,
    PassengerTransport,
    Patrol,
    Relocation,
    Training,
    EmergencyResponse,
}

impl FromStr for DeploymentPurpose {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "delivery" => Ok(Self::Delivery),
            "passenger_transport" => Ok(Self::PassengerTransport),
            "patrol" => Ok(Self::Patrol),
            "relocation" => Ok(Self::Relocation),
            "training" => Ok(Self::Training),
            "emergency_response" => Ok(Self::EmergencyResponse),
            other => Err(format!("unknown deployment purpose '{}'", other)),
        }
    }
}

/// Prioridad del despliegue - mapea al ENUM deployment_priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "deployment_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for DeploymentPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl FromStr for DeploymentPriority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown deployment priority '{}'", other)),
        }
    }
}

/// Snapshot de telemetría en vivo, actualizado solo en `in_progress`.
/// Se guarda como columna JSON; la serie completa vive en el historial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub speed_kmh: Option<f64>,
    pub battery_level: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// Deployment - mapea a la tabla deployments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Deployment {
    pub id: Uuid,
    /// Referencia legible `DEP_###_YYMMDD`, generada por el servidor
    pub reference: String,
    pub vehicle_id: Uuid,
    pub pilot_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_address: String,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub end_address: Option<String>,
    pub purpose: DeploymentPurpose,
    pub status: DeploymentStatus,
    pub telemetry: Option<Json<TelemetrySnapshot>>,
    pub end_reason: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub priority: DeploymentPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Duración: hasta `actual_end_time` si existe, si no hasta la estimada
    pub fn duration(&self) -> chrono::Duration {
        self.actual_end_time.unwrap_or(self.estimated_end_time) - self.start_time
    }

    /// Hora de cierre para estampar `actual_end_time`. Una cancelación
    /// previa a la ventana se acota al inicio: el fin real nunca queda
    /// antes del comienzo y la duración nunca es negativa.
    pub fn end_stamp_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.start_time)
    }

    /// Un despliegue no terminal cuya ventana estimada ya venció
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now > self.estimated_end_time
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    /// Progreso en porcentaje: 100 fijo para `completed`, 0 fijo para
    /// `cancelled`/`emergency_stop`, y la fracción transcurrida acotada
    /// a [0, 100] en el resto de estados.
    pub fn progress_percentage_at(&self, now: DateTime<Utc>) -> f64 {
        match self.status {
            DeploymentStatus::Completed => 100.0,
            DeploymentStatus::Cancelled | DeploymentStatus::EmergencyStop => 0.0,
            _ => {
                let total = (self.estimated_end_time - self.start_time).num_milliseconds();
                if total <= 0 {
                    return 0.0;
                }
                let elapsed = (now - self.start_time).num_milliseconds();
                (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
            }
        }
    }

    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn deployment(status: DeploymentStatus) -> Deployment {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        Deployment {
            id: Uuid::new_v4(),
            reference: "DEP_001_260310".to_string(),
            vehicle_id: Uuid::new_v4(),
            pilot_id: Uuid::new_v4(),
            start_time: start,
            estimated_end_time: start + chrono::Duration::hours(2),
            actual_end_time: None,
            start_latitude: 48.8566,
            start_longitude: 2.3522,
            start_address: "1 Rue de Rivoli, 75001 Paris".to_string(),
            end_latitude: None,
            end_longitude: None,
            end_address: None,
            purpose: DeploymentPurpose::Delivery,
            status,
            telemetry: None,
            end_reason: None,
            estimated_cost: None,
            actual_cost: None,
            priority: DeploymentPriority::Normal,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_status_terminal() {
        assert!(!DeploymentStatus::Scheduled.is_terminal());
        assert!(!DeploymentStatus::InProgress.is_terminal());
        assert!(!DeploymentStatus::EmergencyStop.is_terminal());
        assert!(DeploymentStatus::Completed.is_terminal());
        assert!(DeploymentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_transitions_valid() {
        use DeploymentStatus::*;

        assert!(Scheduled.can_transition_to(InProgress));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(EmergencyStop));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(EmergencyStop.can_transition_to(Completed));
        assert!(EmergencyStop.can_transition_to(Cancelled));
    }

    #[test]
    fn test_status_transitions_invalid() {
        use DeploymentStatus::*;

        // Saltos y retrocesos prohibidos
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Scheduled.can_transition_to(EmergencyStop));
        assert!(!InProgress.can_transition_to(Scheduled));
        assert!(!EmergencyStop.can_transition_to(InProgress));

        // Los terminales no tienen salidas, hacia ningún estado
        for target in [Scheduled, InProgress, Completed, Cancelled, EmergencyStop] {
            assert!(!Completed.can_transition_to(target));
            assert!(!Cancelled.can_transition_to(target));
        }

        // Auto-transiciones rechazadas
        for status in [Scheduled, InProgress, Completed, Cancelled, EmergencyStop] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_accepts_telemetry_only_in_progress() {
        use DeploymentStatus::*;

        assert!(InProgress.accepts_telemetry());
        for status in [Scheduled, Completed, Cancelled, EmergencyStop] {
            assert!(!status.accepts_telemetry());
        }
    }

    #[test]
    fn test_duration_prefers_actual_end() {
        let mut d = deployment(DeploymentStatus::Completed);
        assert_eq!(d.duration(), chrono::Duration::hours(2));

        d.actual_end_time = Some(d.start_time + chrono::Duration::minutes(45));
        assert_eq!(d.duration(), chrono::Duration::minutes(45));
    }

    #[test]
    fn test_prestart_cancellation_keeps_duration_non_negative() {
        let mut d = deployment(DeploymentStatus::Cancelled);

        // Cancelado 25 horas antes de que arranque la ventana: el sello
        // se acota al inicio en vez de quedar en el pasado
        let early = d.start_time - chrono::Duration::hours(25);
        d.actual_end_time = Some(d.end_stamp_at(early));

        assert_eq!(d.actual_end_time, Some(d.start_time));
        assert!(d.duration().num_minutes() >= 0);

        // Un cierre posterior al inicio conserva su hora real
        let late = d.start_time + chrono::Duration::minutes(30);
        assert_eq!(d.end_stamp_at(late), late);
    }

    #[test]
    fn test_is_overdue() {
        let d = deployment(DeploymentStatus::InProgress);
        let before_end = d.estimated_end_time - chrono::Duration::minutes(1);
        let after_end = d.estimated_end_time + chrono::Duration::minutes(1);

        assert!(!d.is_overdue_at(before_end));
        assert!(d.is_overdue_at(after_end));

        // Los terminales nunca están atrasados
        let done = deployment(DeploymentStatus::Completed);
        assert!(!done.is_overdue_at(after_end));
    }

    #[test]
    fn test_progress_percentage() {
        let d = deployment(DeploymentStatus::InProgress);
        let halfway = d.start_time + chrono::Duration::hours(1);

        assert!((d.progress_percentage_at(halfway) - 50.0).abs() < f64::EPSILON);

        // Acotado a [0, 100]
        assert_eq!(d.progress_percentage_at(d.start_time - chrono::Duration::hours(1)), 0.0);
        assert_eq!(
            d.progress_percentage_at(d.estimated_end_time + chrono::Duration::hours(5)),
            100.0
        );

        // Valores forzados por estado
        assert_eq!(deployment(DeploymentStatus::Completed).progress_percentage_at(halfway), 100.0);
        assert_eq!(deployment(DeploymentStatus::Cancelled).progress_percentage_at(halfway), 0.0);
        assert_eq!(
            deployment(DeploymentStatus::EmergencyStop).progress_percentage_at(halfway),
            0.0
        );
    }
}
