use crate::models::deployment::{
    Deployment, DeploymentPriority, DeploymentPurpose, DeploymentStatus, TelemetrySnapshot,
};
use crate::services::window_index::ActiveWindow;
use crate::utils::errors::{conflict_error, AppResult};
use crate::utils::ids::deployment_reference;
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{is_reservation_violation, resource_lock_key};

// Clave fija del contador diario de referencias DEP_
const DEPLOYMENT_SEQUENCE_LOCK: i64 = 710_001;

/// Datos de entrada para reservar un despliegue nuevo
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub vehicle_id: Uuid,
    pub pilot_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_address: String,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub end_address: Option<String>,
    pub purpose: DeploymentPurpose,
    pub priority: DeploymentPriority,
    pub estimated_cost: Option<Decimal>,
}

/// Filtros opcionales del listado
#[derive(Debug, Clone, Default)]
pub struct DeploymentFilters {
    pub status: Option<DeploymentStatus>,
    pub vehicle_id: Option<Uuid>,
    pub pilot_id: Option<Uuid>,
    pub overdue: Option<bool>,
}

pub struct DeploymentRepository {
    pool: PgPool,
}

impl DeploymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserva transaccional: advisory locks por vehículo y piloto,
    /// re-chequeo de solapamiento bajo lock, referencia diaria bajo su
    /// propio lock e INSERT. Así dos creates concurrentes sobre el mismo
    /// recurso nunca pasan los dos el chequeo antes de commitear.
    pub async fn create_reserved(&self, new: &NewDeployment) -> AppResult<Deployment> {
        let mut tx = self.pool.begin().await?;

        // Locks por recurso en orden estable para no interbloquear
        let mut keys = [
            resource_lock_key(new.vehicle_id),
            resource_lock_key(new.pilot_id),
        ];
        keys.sort_unstable();
        for key in keys {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        // Re-chequeo bajo lock: cierra la carrera check-then-act
        if let Some((_, reference)) = Self::vehicle_conflict(
            &mut tx,
            new.vehicle_id,
            new.start_time,
            new.estimated_end_time,
        )
        .await?
        {
            return Err(conflict_error(
                "vehicle",
                &reference,
                "Vehicle already has an active deployment in this window",
            ));
        }

        if let Some((_, reference)) =
            Self::pilot_conflict(&mut tx, new.pilot_id, new.start_time, new.estimated_end_time)
                .await?
        {
            return Err(conflict_error(
                "pilot",
                &reference,
                "Pilot already has an active deployment in this window",
            ));
        }

        // Referencia diaria: contador del día + 1, bajo lock del esquema
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(DEPLOYMENT_SEQUENCE_LOCK)
            .execute(&mut *tx)
            .await?;

        let today = Utc::now().date_naive();
        let day_start = today.and_time(NaiveTime::MIN).and_utc();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM deployments WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(day_start)
        .bind(day_start + chrono::Duration::days(1))
        .fetch_one(&mut *tx)
        .await?;

        let reference = deployment_reference(count + 1, today);
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, Deployment>(
            r#"
            INSERT INTO deployments (
                id, reference, vehicle_id, pilot_id,
                start_time, estimated_end_time,
                start_latitude, start_longitude, start_address,
                end_latitude, end_longitude, end_address,
                purpose, status, priority, estimated_cost,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&reference)
        .bind(new.vehicle_id)
        .bind(new.pilot_id)
        .bind(new.start_time)
        .bind(new.estimated_end_time)
        .bind(new.start_latitude)
        .bind(new.start_longitude)
        .bind(&new.start_address)
        .bind(new.end_latitude)
        .bind(new.end_longitude)
        .bind(&new.end_address)
        .bind(new.purpose)
        .bind(DeploymentStatus::Scheduled)
        .bind(new.priority)
        .bind(new.estimated_cost)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let deployment = match inserted {
            Ok(deployment) => deployment,
            // La restricción de unicidad es la última línea de defensa
            // contra un escritor que no pasó por los advisory locks
            Err(e) if is_reservation_violation(&e) => {
                drop(tx);
                let existing = self.any_conflicting_reference(new).await?;
                return Err(conflict_error(
                    "deployment",
                    existing.as_deref().unwrap_or("unknown"),
                    "The requested window is already reserved",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        Ok(deployment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Deployment>> {
        let deployment = sqlx::query_as::<_, Deployment>("SELECT * FROM deployments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(deployment)
    }

    pub async fn find_by_reference(&self, reference: &str) -> AppResult<Option<Deployment>> {
        let deployment =
            sqlx::query_as::<_, Deployment>("SELECT * FROM deployments WHERE reference = $1")
                .bind(reference)
                .fetch_optional(&self.pool)
                .await?;

        Ok(deployment)
    }

    pub async fn list(&self, filters: &DeploymentFilters) -> AppResult<Vec<Deployment>> {
        let deployments = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT * FROM deployments
            WHERE ($1::deployment_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR vehicle_id = $2)
              AND ($3::uuid IS NULL OR pilot_id = $3)
              AND ($4::boolean IS NOT TRUE
                   OR (status IN ('scheduled', 'in_progress', 'emergency_stop')
                       AND estimated_end_time < $5))
            ORDER BY start_time DESC
            "#,
        )
        .bind(filters.status)
        .bind(filters.vehicle_id)
        .bind(filters.pilot_id)
        .bind(filters.overdue)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        Ok(deployments)
    }

    /// Ventanas del pool activo del vehículo, para el chequeo previo
    pub async fn find_active_windows_for_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> AppResult<Vec<ActiveWindow>> {
        let rows: Vec<(Uuid, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, reference, start_time, estimated_end_time FROM deployments
            WHERE vehicle_id = $1
              AND status IN ('scheduled', 'in_progress', 'emergency_stop')
            ORDER BY start_time
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, reference, start, end)| ActiveWindow {
                id,
                reference,
                start,
                end,
            })
            .collect())
    }

    /// Ventanas del pool activo del piloto, para el chequeo previo
    pub async fn find_active_windows_for_pilot(
        &self,
        pilot_id: Uuid,
    ) -> AppResult<Vec<ActiveWindow>> {
        let rows: Vec<(Uuid, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, reference, start_time, estimated_end_time FROM deployments
            WHERE pilot_id = $1
              AND status IN ('scheduled', 'in_progress', 'emergency_stop')
            ORDER BY start_time
            "#,
        )
        .bind(pilot_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, reference, start, end)| ActiveWindow {
                id,
                reference,
                start,
                end,
            })
            .collect())
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: DeploymentStatus,
        actual_end_time: Option<DateTime<Utc>>,
        end_reason: Option<String>,
        actual_cost: Option<Decimal>,
    ) -> AppResult<Deployment> {
        let deployment = sqlx::query_as::<_, Deployment>(
            r#"
            UPDATE deployments
            SET status = $2,
                actual_end_time = COALESCE($3, actual_end_time),
                end_reason = COALESCE($4, end_reason),
                actual_cost = COALESCE($5, actual_cost),
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(actual_end_time)
        .bind(end_reason)
        .bind(actual_cost)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(deployment)
    }

    pub async fn update_telemetry(
        &self,
        id: Uuid,
        snapshot: &TelemetrySnapshot,
    ) -> AppResult<Deployment> {
        let deployment = sqlx::query_as::<_, Deployment>(
            "UPDATE deployments SET telemetry = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Json(snapshot))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(deployment)
    }

    async fn vehicle_conflict(
        tx: &mut Transaction<'_, Postgres>,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Option<(Uuid, String)>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, reference FROM deployments
            WHERE vehicle_id = $1
              AND status IN ('scheduled', 'in_progress', 'emergency_stop')
              AND start_time < $3 AND $2 < estimated_end_time
            ORDER BY start_time
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    async fn pilot_conflict(
        tx: &mut Transaction<'_, Postgres>,
        pilot_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Option<(Uuid, String)>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, reference FROM deployments
            WHERE pilot_id = $1
              AND status IN ('scheduled', 'in_progress', 'emergency_stop')
              AND start_time < $3 AND $2 < estimated_end_time
            ORDER BY start_time
            LIMIT 1
            "#,
        )
        .bind(pilot_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    async fn any_conflicting_reference(&self, new: &NewDeployment) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT reference FROM deployments
            WHERE (vehicle_id = $1 OR pilot_id = $2)
              AND status IN ('scheduled', 'in_progress', 'emergency_stop')
              AND start_time < $4 AND $3 < estimated_end_time
            ORDER BY start_time
            LIMIT 1
            "#,
        )
        .bind(new.vehicle_id)
        .bind(new.pilot_id)
        .bind(new.start_time)
        .bind(new.estimated_end_time)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }
}
