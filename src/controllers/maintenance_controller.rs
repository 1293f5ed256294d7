use crate::dto::maintenance_dto::{
    CreateMaintenanceRequest, ListMaintenanceQuery, MaintenanceResponse,
    TransitionMaintenanceRequest,
};
use crate::dto::ApiResponse;
use crate::models::maintenance::MaintenanceStatus;
use crate::models::vehicle::VehicleStatus;
use crate::repositories::maintenance_repository::{
    MaintenanceFilters, MaintenanceRepository, NewMaintenance,
};
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::services::window_index::{first_conflict, TimeWindow};
use crate::utils::errors::{
    conflict_error, field_validation_error, invalid_transition_error, not_found_error,
    validation_error, AppError,
};
use crate::utils::validation::validate_time_window;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub struct MaintenanceController {
    maintenance: MaintenanceRepository,
    vehicles: VehicleRepository,
}

impl MaintenanceController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            maintenance: MaintenanceRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool),
        }
    }

    pub async fn create(
        &self,
        request: CreateMaintenanceRequest,
    ) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        request.validate()?;

        // Sin tope de duración: un mantenimiento puede llevar días
        validate_time_window(request.unavailable_from, request.unavailable_to, None)
            .map_err(|e| field_validation_error("unavailable_to", e))?;

        // El vehículo debe existir, pero no hace falta que esté disponible:
        // programar el taller de la semana que viene sobre un vehículo
        // desplegado hoy es un caso normal
        let vehicle = self
            .vehicles
            .find_by_id(request.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &request.vehicle_id.to_string()))?;

        let windows = self
            .maintenance
            .find_active_windows_for_vehicle(vehicle.id)
            .await?;
        let candidate = TimeWindow::new(request.unavailable_from, request.unavailable_to);

        if let Some(taken) = first_conflict(&candidate, &windows) {
            return Err(conflict_error(
                "vehicle",
                &taken.reference,
                "Vehicle already has an active maintenance window in this range",
            ));
        }

        let new = NewMaintenance {
            vehicle_id: vehicle.id,
            maintenance_type: request.maintenance_type,
            priority: request.priority.unwrap_or_default(),
            unavailable_from: request.unavailable_from,
            unavailable_to: request.unavailable_to,
            description: request.description,
        };

        let created = self.maintenance.create_reserved(&new).await?;

        log::info!(
            "🔧 Mantenimiento {} programado para vehículo {}",
            created.reference,
            vehicle.registration
        );

        Ok(ApiResponse::success_with_message(
            MaintenanceResponse::from(created),
            "Maintenance window scheduled successfully".to_string(),
        ))
    }

    pub async fn transition(
        &self,
        id: Uuid,
        request: TransitionMaintenanceRequest,
    ) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        request.validate()?;

        let target: MaintenanceStatus = request
            .target_status
            .parse()
            .map_err(|_| validation_error("target_status", "unknown maintenance status"))?;

        let record = self
            .maintenance
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Maintenance", &id.to_string()))?;

        let current = record.status;
        if !current.can_transition_to(target) {
            return Err(invalid_transition_error(current.as_str(), target.as_str()));
        }

        // Los datos de cierre solo acompañan al completado
        let (completed_at, quality, parts, diagnostics) =
            if target == MaintenanceStatus::Completed {
                (
                    record.completed_at.is_none().then(chrono::Utc::now),
                    request.quality_check_passed,
                    request.parts_replaced,
                    request.diagnostics,
                )
            } else {
                (None, None, None, None)
            };

        let updated = self
            .maintenance
            .set_status(id, target, completed_at, quality, parts, diagnostics)
            .await?;

        self.sync_vehicle_status(updated.vehicle_id, current, target)
            .await?;

        log::info!(
            "🔧 Mantenimiento {} pasó de {} a {}",
            updated.reference,
            current,
            target
        );

        Ok(ApiResponse::success_with_message(
            MaintenanceResponse::from(updated),
            format!("Maintenance transitioned to '{}'", target),
        ))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        let record = self
            .maintenance
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Maintenance", &id.to_string()))?;

        Ok(ApiResponse::success(MaintenanceResponse::from(record)))
    }

    pub async fn list(
        &self,
        query: ListMaintenanceQuery,
    ) -> Result<ApiResponse<Vec<MaintenanceResponse>>, AppError> {
        let status = query
            .status
            .as_deref()
            .map(|raw| {
                raw.parse::<MaintenanceStatus>()
                    .map_err(|_| validation_error("status", "unknown maintenance status"))
            })
            .transpose()?;

        let filters = MaintenanceFilters {
            status,
            vehicle_id: query.vehicle_id,
        };

        let logs = self.maintenance.list(&filters).await?;
        let responses = logs.into_iter().map(MaintenanceResponse::from).collect();

        Ok(ApiResponse::success(responses))
    }

    /// El vehículo entra a taller al empezar el trabajo y vuelve a estar
    /// disponible al dejarlo, sin pisar estados que no pusimos nosotros
    async fn sync_vehicle_status(
        &self,
        vehicle_id: Uuid,
        from: MaintenanceStatus,
        target: MaintenanceStatus,
    ) -> Result<(), AppError> {
        match target {
            MaintenanceStatus::InProgress => {
                self.vehicles
                    .update_status(vehicle_id, VehicleStatus::Maintenance)
                    .await?;
            }
            MaintenanceStatus::Completed
            | MaintenanceStatus::Failed
            | MaintenanceStatus::Cancelled
                if from.is_active() =>
            {
                let released = self
                    .vehicles
                    .release_status(vehicle_id, VehicleStatus::Maintenance)
                    .await?;
                if !released {
                    log::debug!(
                        "ℹ️ Vehículo {} no estaba en maintenance, se deja como está",
                        vehicle_id
                    );
                }
            }
            _ => {}
        }

        Ok(())
    }
}
