use crate::models::maintenance::{
    DiagnosticResult, MaintenanceLog, MaintenancePriority, MaintenanceStatus, MaintenanceType,
    PartReplaced,
};
use crate::services::window_index::ActiveWindow;
use crate::utils::errors::{conflict_error, AppResult};
use crate::utils::ids::maintenance_reference;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{is_reservation_violation, resource_lock_key};

// Clave fija del contador diario de referencias MAINT_
const MAINTENANCE_SEQUENCE_LOCK: i64 = 710_002;

/// Datos de entrada para reservar una ventana de mantenimiento
#[derive(Debug, Clone)]
pub struct NewMaintenance {
    pub vehicle_id: Uuid,
    pub maintenance_type: MaintenanceType,
    pub priority: MaintenancePriority,
    pub unavailable_from: DateTime<Utc>,
    pub unavailable_to: DateTime<Utc>,
    pub description: String,
}

/// Filtros opcionales del listado
#[derive(Debug, Clone, Default)]
pub struct MaintenanceFilters {
    pub status: Option<MaintenanceStatus>,
    pub vehicle_id: Option<Uuid>,
}

pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserva transaccional contra el pool de mantenimiento del
    /// vehículo. El pool de despliegues no se consulta: son pools
    /// separados por diseño.
    pub async fn create_reserved(&self, new: &NewMaintenance) -> AppResult<MaintenanceLog> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(resource_lock_key(new.vehicle_id))
            .execute(&mut *tx)
            .await?;

        // Re-chequeo bajo lock contra ventanas activas de mantenimiento
        if let Some((_, reference)) = Self::vehicle_conflict(
            &mut tx,
            new.vehicle_id,
            new.unavailable_from,
            new.unavailable_to,
        )
        .await?
        {
            return Err(conflict_error(
                "vehicle",
                &reference,
                "Vehicle already has an active maintenance window in this range",
            ));
        }

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MAINTENANCE_SEQUENCE_LOCK)
            .execute(&mut *tx)
            .await?;

        let today = Utc::now().date_naive();
        let day_start = today.and_time(NaiveTime::MIN).and_utc();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM vehicle_maintenance_logs WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(day_start)
        .bind(day_start + chrono::Duration::days(1))
        .fetch_one(&mut *tx)
        .await?;

        let reference = maintenance_reference(today, count + 1);
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, MaintenanceLog>(
            r#"
            INSERT INTO vehicle_maintenance_logs (
                id, reference, vehicle_id, maintenance_type, priority, status,
                scheduled_date, unavailable_from, unavailable_to, description,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&reference)
        .bind(new.vehicle_id)
        .bind(new.maintenance_type)
        .bind(new.priority)
        .bind(MaintenanceStatus::Scheduled)
        .bind(new.unavailable_from.date_naive())
        .bind(new.unavailable_from)
        .bind(new.unavailable_to)
        .bind(&new.description)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let log = match inserted {
            Ok(log) => log,
            Err(e) if is_reservation_violation(&e) => {
                drop(tx);
                let existing = self
                    .any_conflicting_reference(
                        new.vehicle_id,
                        new.unavailable_from,
                        new.unavailable_to,
                    )
                    .await?;
                return Err(conflict_error(
                    "maintenance",
                    existing.as_deref().unwrap_or("unknown"),
                    "The requested maintenance window is already reserved",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        Ok(log)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MaintenanceLog>> {
        let log = sqlx::query_as::<_, MaintenanceLog>(
            "SELECT * FROM vehicle_maintenance_logs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    pub async fn list(&self, filters: &MaintenanceFilters) -> AppResult<Vec<MaintenanceLog>> {
        let logs = sqlx::query_as::<_, MaintenanceLog>(
            r#"
            SELECT * FROM vehicle_maintenance_logs
            WHERE ($1::maintenance_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR vehicle_id = $2)
            ORDER BY unavailable_from DESC
            "#,
        )
        .bind(filters.status)
        .bind(filters.vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    /// Ventanas del pool de mantenimiento del vehículo
    pub async fn find_active_windows_for_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> AppResult<Vec<ActiveWindow>> {
        let rows: Vec<(Uuid, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, reference, unavailable_from, unavailable_to FROM vehicle_maintenance_logs
            WHERE vehicle_id = $1
              AND status IN ('scheduled', 'in_progress', 'delayed')
            ORDER BY unavailable_from
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

    pub async fn set_status(
        &self,
        id: Uuid,
        status: MaintenanceStatus,
        completed_at: Option<DateTime<Utc>>,
        quality_check_passed: Option<bool>,
        parts_replaced: Option<Vec<PartReplaced>>,
        diagnostics: Option<Vec<DiagnosticResult>>,
    ) -> AppResult<MaintenanceLog> {
        let log = sqlx::query_as::<_, MaintenanceLog>(
            r#"
            UPDATE vehicle_maintenance_logs
            SET status = $2,
                completed_at = COALESCE($3, completed_at),
                quality_check_passed = COALESCE($4, quality_check_passed),
                parts_replaced = COALESCE($5, parts_replaced),
                diagnostics = COALESCE($6, diagnostics),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(completed_at)
        .bind(quality_check_passed)
        .bind(parts_replaced.map(Json))
        .bind(diagnostics.map(Json))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    async fn vehicle_conflict(
        tx: &mut Transaction<'_, Postgres>,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Option<(Uuid, String)>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, reference FROM vehicle_maintenance_logs
            WHERE vehicle_id = $1
              AND status IN ('scheduled', 'in_progress', 'delayed')
              AND unavailable_from < $3 AND $2 < unavailable_to
            ORDER BY unavailable_from
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

    async fn any_conflicting_reference(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT reference FROM vehicle_maintenance_logs
            WHERE vehicle_id = $1
              AND status IN ('scheduled', 'in_progress', 'delayed')
              AND unavailable_from < $3 AND $2 < unavailable_to
            ORDER BY unavailable_from
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }
}
