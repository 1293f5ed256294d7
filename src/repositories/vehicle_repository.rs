use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::utils::errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    /// Cambio incondicional de estado, usado cuando el ciclo de vida
    /// toma posesión del vehículo (despliegue o mantenimiento en curso)
    pub async fn update_status(&self, id: Uuid, status: VehicleStatus) -> AppResult<()> {
        sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Devuelve el vehículo a `available` solo si todavía está en el
    /// estado esperado. Así no pisamos un estado puesto por afuera
    /// (por ejemplo `charging`) entre medio. Devuelve true si escribió.
    pub async fn release_status(&self, id: Uuid, expected: VehicleStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id)
            .bind(VehicleStatus::Available)
            .bind(expected)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
