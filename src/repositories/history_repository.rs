use crate::models::deployment::DeploymentStatus;
use crate::models::history::{
    CommunicationEntry, CommunicationPriority, CommunicationType, DeploymentHistory,
    IncidentReport, IncidentSeverity, IncidentType, LocationPing, StatusChangeEntry,
};
use crate::services::geo_metrics::incremental_mean;
use crate::utils::errors::{invalid_state_error, not_found_error, validation_error, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

// Creación perezosa del shell: los escritores nunca fallan por
// historial ausente, lo crean en la primera escritura
const ENSURE_SHELL_SQL: &str = r#"
    INSERT INTO deployment_history (
        deployment_id, ping_count, accuracy_samples, gap_count, created_at, updated_at
    )
    VALUES ($1, 0, 0, 0, $2, $2)
    ON CONFLICT (deployment_id) DO NOTHING
"#;

/// Datos de entrada de un ping de ubicación
#[derive(Debug, Clone)]
pub struct NewLocationPing {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub accuracy_m: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub battery_level: Option<f64>,
    pub altitude_m: Option<f64>,
    /// Hora del dispositivo; None usa la del servidor
    pub recorded_at: Option<DateTime<Utc>>,
}

pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_shell(&self, deployment_id: Uuid) -> AppResult<()> {
        sqlx::query(ENSURE_SHELL_SQL)
            .bind(deployment_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_shell(&self, deployment_id: Uuid) -> AppResult<Option<DeploymentHistory>> {
        let shell = sqlx::query_as::<_, DeploymentHistory>(
            "SELECT * FROM deployment_history WHERE deployment_id = $1",
        )
        .bind(deployment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shell)
    }

    /// Registra un cambio de estado con hora del servidor, nunca la del
    /// dispositivo
    pub async fn append_status_change(
        &self,
        deployment_id: Uuid,
        from_status: Option<DeploymentStatus>,
        to_status: DeploymentStatus,
        changed_by: Option<String>,
        reason: Option<String>,
        system_generated: bool,
    ) -> AppResult<StatusChangeEntry> {
        self.ensure_shell(deployment_id).await?;

        let entry = sqlx::query_as::<_, StatusChangeEntry>(
            r#"
            INSERT INTO deployment_status_changes (
                id, deployment_id, from_status, to_status, changed_by, reason,
                system_generated, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(deployment_id)
        .bind(from_status)
        .bind(to_status)
        .bind(changed_by)
        .bind(reason)
        .bind(system_generated)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Inserta un ping y actualiza los contadores de calidad de datos en
    /// la misma transacción. El shell se toma FOR UPDATE: el orden de la
    /// serie nunca decrece aunque entren pings concurrentes.
    pub async fn append_ping(
        &self,
        deployment_id: Uuid,
        new: &NewLocationPing,
        gap_threshold_minutes: i64,
    ) -> AppResult<LocationPing> {
        // Hora del dispositivo si vino, la del servidor si no
        let recorded_at = new.recorded_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        Self::ensure_shell_in_tx(&mut tx, deployment_id).await?;

        let shell = sqlx::query_as::<_, DeploymentHistory>(
            "SELECT * FROM deployment_history WHERE deployment_id = $1 FOR UPDATE",
        )
        .bind(deployment_id)
        .fetch_one(&mut *tx)
        .await?;

        // Timestamps iguales se aceptan, retrocesos no
        if let Some(last) = shell.last_ping_at {
            if recorded_at < last {
                return Err(validation_error(
                    "recorded_at",
                    "ping is older than the last recorded ping",
                ));
            }
        }

        let ping = sqlx::query_as::<_, LocationPing>(
            r#"
            INSERT INTO deployment_location_pings (
                id, deployment_id, latitude, longitude, address, accuracy_m,
                speed_kmh, battery_level, altitude_m, recorded_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(deployment_id)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.address)
        .bind(new.accuracy_m)
        .bind(new.speed_kmh)
        .bind(new.battery_level)
        .bind(new.altitude_m)
        .bind(recorded_at)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        // Media incremental de accuracy, sin reescanear la serie
        let (average_accuracy_m, accuracy_samples) = match new.accuracy_m {
            Some(value) => (
                Some(incremental_mean(
                    shell.average_accuracy_m,
                    shell.accuracy_samples,
                    value,
                )),
                shell.accuracy_samples + 1,
            ),
            None => (shell.average_accuracy_m, shell.accuracy_samples),
        };

        let gap_detected = shell
            .last_ping_at
            .map(|last| (recorded_at - last).num_minutes() > gap_threshold_minutes)
            .unwrap_or(false);

        sqlx::query(
            r#"
            UPDATE deployment_history
            SET ping_count = ping_count + 1,
                accuracy_samples = $2,
                average_accuracy_m = $3,
                gap_count = gap_count + $4,
                last_ping_at = $5,
                updated_at = $6
            WHERE deployment_id = $1
            "#,
        )
        .bind(deployment_id)
        .bind(accuracy_samples)
        .bind(average_accuracy_m)
        .bind(if gap_detected { 1i64 } else { 0i64 })
        .bind(recorded_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ping)
    }

    pub async fn append_incident(
        &self,
        deployment_id: Uuid,
        incident_type: IncidentType,
        severity: IncidentSeverity,
        description: String,
        reported_by: Option<String>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> AppResult<IncidentReport> {
        self.ensure_shell(deployment_id).await?;

        let incident = sqlx::query_as::<_, IncidentReport>(
            r#"
            INSERT INTO deployment_incidents (
                id, deployment_id, incident_type, severity, description,
                reported_by, occurred_at, resolved, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(deployment_id)
        .bind(incident_type)
        .bind(severity)
        .bind(description)
        .bind(reported_by)
        .bind(occurred_at.unwrap_or_else(Utc::now))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(incident)
    }

    pub async fn resolve_incident(
        &self,
        deployment_id: Uuid,
        incident_id: Uuid,
        resolution_note: Option<String>,
    ) -> AppResult<IncidentReport> {
        let resolved = sqlx::query_as::<_, IncidentReport>(
            r#"
            UPDATE deployment_incidents
            SET resolved = TRUE,
                resolved_at = $3,
                resolution_note = COALESCE($4, resolution_note)
            WHERE id = $2 AND deployment_id = $1 AND resolved = FALSE
            RETURNING *
            "#,
        )
        .bind(deployment_id)
        .bind(incident_id)
        .bind(Utc::now())
        .bind(resolution_note)
        .fetch_optional(&self.pool)
        .await?;

        match resolved {
            Some(incident) => Ok(incident),
            None => {
                let exists: (bool,) = sqlx::query_as(
                    "SELECT EXISTS(SELECT 1 FROM deployment_incidents WHERE id = $1 AND deployment_id = $2)",
                )
                .bind(incident_id)
                .bind(deployment_id)
                .fetch_one(&self.pool)
                .await?;

                if exists.0 {
                    Err(invalid_state_error("resolve incident", "resolved"))
                } else {
                    Err(not_found_error("Incident", &incident_id.to_string()))
                }
            }
        }
    }

    pub async fn append_communication(
        &self,
        deployment_id: Uuid,
        comm_type: CommunicationType,
        priority: CommunicationPriority,
        message: String,
        sender: Option<String>,
        recipient: Option<String>,
    ) -> AppResult<CommunicationEntry> {
        self.ensure_shell(deployment_id).await?;

        let entry = sqlx::query_as::<_, CommunicationEntry>(
            r#"
            INSERT INTO deployment_communications (
                id, deployment_id, comm_type, priority, message, sender, recipient, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(deployment_id)
        .bind(comm_type)
        .bind(priority)
        .bind(message)
        .bind(sender)
        .bind(recipient)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Serie completa de pings en orden ascendente, la entrada que
    /// esperan las métricas
    pub async fn find_pings(&self, deployment_id: Uuid) -> AppResult<Vec<LocationPing>> {
        let pings = sqlx::query_as::<_, LocationPing>(
            "SELECT * FROM deployment_location_pings WHERE deployment_id = $1 ORDER BY recorded_at ASC",
        )
        .bind(deployment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pings)
    }

    pub async fn find_status_changes(
        &self,
        deployment_id: Uuid,
    ) -> AppResult<Vec<StatusChangeEntry>> {
        let changes = sqlx::query_as::<_, StatusChangeEntry>(
            "SELECT * FROM deployment_status_changes WHERE deployment_id = $1 ORDER BY created_at ASC",
        )
        .bind(deployment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }

    pub async fn find_incidents(&self, deployment_id: Uuid) -> AppResult<Vec<IncidentReport>> {
        let incidents = sqlx::query_as::<_, IncidentReport>(
            "SELECT * FROM deployment_incidents WHERE deployment_id = $1 ORDER BY occurred_at ASC",
        )
        .bind(deployment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(incidents)
    }

    pub async fn find_communications(
        &self,
        deployment_id: Uuid,
    ) -> AppResult<Vec<CommunicationEntry>> {
        let communications = sqlx::query_as::<_, CommunicationEntry>(
            "SELECT * FROM deployment_communications WHERE deployment_id = $1 ORDER BY created_at ASC",
        )
        .bind(deployment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(communications)
    }

    async fn ensure_shell_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        deployment_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(ENSURE_SHELL_SQL)
            .bind(deployment_id)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}
