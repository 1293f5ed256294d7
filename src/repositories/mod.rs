//! Repositorios de acceso a datos
//!
//! Este módulo contiene el acceso a PostgreSQL vía sqlx. Toda decisión
//! de dominio vive en models/ y services/; acá solo hay SQL, binds y la
//! traducción de violaciones de constraints a errores del dominio.

pub mod deployment_repository;
pub mod history_repository;
pub mod maintenance_repository;
pub mod pilot_repository;
pub mod vehicle_repository;

use uuid::Uuid;

/// Clave de advisory lock derivada del UUID del recurso. Alcanza con los
/// primeros 8 bytes: una colisión entre recursos distintos solo agrega
/// espera, nunca corrompe la reserva.
pub fn resource_lock_key(id: Uuid) -> i64 {
    let bytes = id.as_bytes();
    let mut key = [0u8; 8];
    key.copy_from_slice(&bytes[..8]);
    i64::from_be_bytes(key)
}

/// 23505 (unique) y 23P01 (exclusion) en una reserva son una carrera
/// perdida contra otro escritor: se traducen a Conflict, nunca a 500
pub fn is_reservation_violation(error: &sqlx::Error) -> bool {
    matches!(
        error
            .as_database_error()
            .and_then(|db| db.code())
            .as_deref(),
        Some("23505") | Some("23P01")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_lock_key_is_stable() {
        let id = Uuid::new_v4();
        assert_eq!(resource_lock_key(id), resource_lock_key(id));
    }

    #[test]
    fn test_resource_lock_key_differs_between_resources() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(resource_lock_key(a), resource_lock_key(b));
    }
}
