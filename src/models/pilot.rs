//! Modelo de Pilot
//!
//! El registro de pilotos pertenece al sistema de personal externo.
//! Este core solo verifica existencia y rol operativo al crear despliegues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Roles que habilitan a un piloto para operar despliegues
pub const OPERATING_ROLES: [&str; 2] = ["pilot", "senior_pilot"];

/// Pilot - mapea a la tabla pilots del sistema de personal
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pilot {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Pilot {
    /// Un piloto puede operar si está activo y tiene rol operativo
    pub fn can_operate(&self) -> bool {
        self.is_active && OPERATING_ROLES.contains(&self.role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pilot(role: &str, active: bool) -> Pilot {
        Pilot {
            id: Uuid::new_v4(),
            full_name: "Test Pilot".to_string(),
            email: "pilot@fleet.test".to_string(),
            role: role.to_string(),
            is_active: active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_operate() {
        assert!(pilot("pilot", true).can_operate());
        assert!(pilot("senior_pilot", true).can_operate());
        assert!(!pilot("dispatcher", true).can_operate());
        assert!(!pilot("pilot", false).can_operate());
    }
}
