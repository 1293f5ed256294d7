//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle tal como lo ve este core.
//! El registro pertenece al sistema de flota externo; aquí solo se lee
//! y se actualiza su estado para mantenerlo en acuerdo con los
//! despliegues y mantenimientos activos.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    Deployed,
    Maintenance,
    Charging,
    OutOfService,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Deployed => "deployed",
            Self::Maintenance => "maintenance",
            Self::Charging => "charging",
            Self::OutOfService => "out_of_service",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "available" => Ok(Self::Available),
            "deployed" => Ok(Self::Deployed),
            "maintenance" => Ok(Self::Maintenance),
            "charging" => Ok(Self::Charging),
            "out_of_service" => Ok(Self::OutOfService),
            other => Err(format!("unknown vehicle status '{}'", other)),
        }
    }
}

/// Vehicle - mapea a la tabla vehicles del sistema de flota
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub registration: String,
    pub model: Option<String>,
    pub battery_capacity_kwh: Option<Decimal>,
    pub range_km: Option<Decimal>,
    pub status: VehicleStatus,
    pub current_hub: Option<String>,
    pub health_score: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// Un vehículo solo puede recibir un despliegue nuevo estando disponible
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_status_round_trip() {
        for status in [
            VehicleStatus::Available,
            VehicleStatus::Deployed,
            VehicleStatus::Maintenance,
            VehicleStatus::Charging,
            VehicleStatus::OutOfService,
        ] {
            assert_eq!(VehicleStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(VehicleStatus::from_str("flying").is_err());
    }
}
