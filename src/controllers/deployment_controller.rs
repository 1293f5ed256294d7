use crate::config::EnvironmentConfig;
use crate::dto::deployment_dto::{
    CreateDeploymentRequest, DeploymentResponse, ListDeploymentsQuery, TransitionDeploymentRequest,
    UpdateTelemetryRequest,
};
use crate::dto::ApiResponse;
use crate::models::deployment::{DeploymentStatus, TelemetrySnapshot};
use crate::models::vehicle::VehicleStatus;
use crate::repositories::deployment_repository::{
    DeploymentFilters, DeploymentRepository, NewDeployment,
};
use crate::repositories::history_repository::{HistoryRepository, NewLocationPing};
use crate::repositories::pilot_repository::PilotRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::services::geo_metrics::compute_metrics;
use crate::services::window_index::{first_conflict, TimeWindow};
use crate::utils::errors::{
    conflict_error, field_validation_error, invalid_state_error, invalid_transition_error,
    not_found_error, validation_error, AppError,
};
use crate::utils::ids::looks_like_deployment_reference;
use crate::utils::validation::{validate_coordinates, validate_time_window};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

pub struct DeploymentController {
    deployments: DeploymentRepository,
    vehicles: VehicleRepository,
    pilots: PilotRepository,
    history: HistoryRepository,
    config: EnvironmentConfig,
}

impl DeploymentController {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self {
            deployments: DeploymentRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            pilots: PilotRepository::new(pool.clone()),
            history: HistoryRepository::new(pool),
            config,
        }
    }

    pub async fn create(
        &self,
        request: CreateDeploymentRequest,
    ) -> Result<ApiResponse<DeploymentResponse>, AppError> {
        request.validate()?;

        validate_time_window(
            request.start_time,
            request.estimated_end_time,
            Some(self.config.max_deployment_hours),
        )
        .map_err(|e| field_validation_error("estimated_end_time", e))?;

        validate_coordinates(request.start_latitude, request.start_longitude)
            .map_err(|e| field_validation_error("start_latitude", e))?;

        match (request.end_latitude, request.end_longitude) {
            (Some(lat), Some(lng)) => validate_coordinates(lat, lng)
                .map_err(|e| field_validation_error("end_latitude", e))?,
            (None, None) => {}
            _ => {
                return Err(validation_error(
                    "end_latitude",
                    "end coordinates must be provided together",
                ))
            }
        }

        // El vehículo tiene que existir y estar disponible ahora mismo
        let vehicle = self
            .vehicles
            .find_by_id(request.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &request.vehicle_id.to_string()))?;

        if !vehicle.is_available() {
            return Err(invalid_state_error("deploy vehicle", vehicle.status.as_str()));
        }

        // Un registro sin rol operativo no cuenta como piloto asignable
        let pilot = self
            .pilots
            .find_by_id(request.pilot_id)
            .await?
            .filter(|p| p.can_operate())
            .ok_or_else(|| not_found_error("Pilot", &request.pilot_id.to_string()))?;

        // Chequeo previo contra los dos pools activos, en paralelo
        let (vehicle_windows, pilot_windows) = futures::try_join!(
            self.deployments.find_active_windows_for_vehicle(vehicle.id),
            self.deployments.find_active_windows_for_pilot(pilot.id),
        )?;

        let candidate = TimeWindow::new(request.start_time, request.estimated_end_time);

        if let Some(taken) = first_conflict(&candidate, &vehicle_windows) {
            return Err(conflict_error(
                "vehicle",
                &taken.reference,
                "Vehicle already has an active deployment in this window",
            ));
        }

        if let Some(taken) = first_conflict(&candidate, &pilot_windows) {
            return Err(conflict_error(
                "pilot",
                &taken.reference,
                "Pilot already has an active deployment in this window",
            ));
        }

        let new = NewDeployment {
            vehicle_id: vehicle.id,
            pilot_id: pilot.id,
            start_time: request.start_time,
            estimated_end_time: request.estimated_end_time,
            start_latitude: request.start_latitude,
            start_longitude: request.start_longitude,
            start_address: request.start_address,
            end_latitude: request.end_latitude,
            end_longitude: request.end_longitude,
            end_address: request.end_address,
            purpose: request.purpose,
            priority: request.priority.unwrap_or_default(),
            estimated_cost: request.estimated_cost,
        };

        let deployment = self.deployments.create_reserved(&new).await?;

        // Primera entrada del historial: nacimiento en scheduled
        self.history
            .append_status_change(
                deployment.id,
                None,
                DeploymentStatus::Scheduled,
                None,
                None,
                true,
            )
            .await?;

        log::info!(
            "🚁 Despliegue {} creado: vehículo {} piloto {}",
            deployment.reference,
            vehicle.registration,
            pilot.full_name
        );

        Ok(ApiResponse::success_with_message(
            DeploymentResponse::from(deployment),
            "Deployment scheduled successfully".to_string(),
        ))
    }

    pub async fn transition(
        &self,
        id: Uuid,
        request: TransitionDeploymentRequest,
    ) -> Result<ApiResponse<DeploymentResponse>, AppError> {
        request.validate()?;

        let target: DeploymentStatus = request
            .target_status
            .parse()
            .map_err(|_| validation_error("target_status", "unknown deployment status"))?;

        let deployment = self
            .deployments
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Deployment", &id.to_string()))?;

        let current = deployment.status;
        if !current.can_transition_to(target) {
            return Err(invalid_transition_error(current.as_str(), target.as_str()));
        }

        let ends_run = matches!(
            target,
            DeploymentStatus::Completed
                | DeploymentStatus::Cancelled
                | DeploymentStatus::EmergencyStop
        );

        // El fin real se fija una sola vez: un completed después de un
        // emergency_stop conserva la hora del stop. El sello se acota al
        // inicio para que cancelar antes de la ventana no deje un fin
        // anterior al comienzo.
        let actual_end_time = (ends_run && deployment.actual_end_time.is_none())
            .then(|| deployment.end_stamp_at(chrono::Utc::now()));
        let end_reason = if ends_run { request.reason.clone() } else { None };

        // Al completar, el costo real sale de la distancia recorrida
        let actual_cost = if target == DeploymentStatus::Completed {
            let pings = self.history.find_pings(id).await?;
            compute_metrics(
                &pings,
                self.config.carbon_factor_kg_per_km,
                self.config.telemetry_gap_minutes,
            )
            .and_then(|m| Decimal::from_f64_retain(m.total_distance_km * self.config.cost_per_km))
        } else {
            None
        };

        let updated = self
            .deployments
            .set_status(id, target, actual_end_time, end_reason, actual_cost)
            .await?;

        self.history
            .append_status_change(
                id,
                Some(current),
                target,
                request.actor,
                request.reason,
                request.system_generated.unwrap_or(false),
            )
            .await?;

        self.sync_vehicle_status(updated.vehicle_id, target).await?;

        if target == DeploymentStatus::EmergencyStop {
            log::warn!("🛑 Parada de emergencia en {}", updated.reference);
        } else {
            log::info!(
                "✅ Despliegue {} pasó de {} a {}",
                updated.reference,
                current,
                target
            );
        }

        Ok(ApiResponse::success_with_message(
            DeploymentResponse::from(updated),
            format!("Deployment transitioned to '{}'", target),
        ))
    }

    pub async fn update_telemetry(
        &self,
        id: Uuid,
        request: UpdateTelemetryRequest,
    ) -> Result<ApiResponse<DeploymentResponse>, AppError> {
        request.validate()?;

        validate_coordinates(request.latitude, request.longitude)
            .map_err(|e| field_validation_error("latitude", e))?;

        let deployment = self
            .deployments
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Deployment", &id.to_string()))?;

        if !deployment.status.accepts_telemetry() {
            return Err(invalid_state_error(
                "update telemetry",
                deployment.status.as_str(),
            ));
        }

        let ping = self
            .history
            .append_ping(
                id,
                &NewLocationPing {
                    latitude: request.latitude,
                    longitude: request.longitude,
                    address: request.address.clone(),
                    accuracy_m: request.accuracy_m,
                    speed_kmh: request.speed_kmh,
                    battery_level: request.battery_level,
                    altitude_m: request.altitude_m,
                    recorded_at: request.recorded_at,
                },
                self.config.telemetry_gap_minutes,
            )
            .await?;

        let snapshot = TelemetrySnapshot {
            latitude: request.latitude,
            longitude: request.longitude,
            address: request.address,
            speed_kmh: request.speed_kmh,
            battery_level: request.battery_level,
            updated_at: ping.recorded_at,
        };

        let updated = self.deployments.update_telemetry(id, &snapshot).await?;

        log::debug!("📍 Telemetría de {} actualizada", updated.reference);

        Ok(ApiResponse::success(DeploymentResponse::from(updated)))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<DeploymentResponse>, AppError> {
        let deployment = self
            .deployments
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Deployment", &id.to_string()))?;

        Ok(ApiResponse::success(DeploymentResponse::from(deployment)))
    }

    pub async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<ApiResponse<DeploymentResponse>, AppError> {
        // Un string sin forma DEP_###_YYMMDD no puede existir en la tabla
        if !looks_like_deployment_reference(reference) {
            return Err(not_found_error("Deployment", reference));
        }

        let deployment = self
            .deployments
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| not_found_error("Deployment", reference))?;

        Ok(ApiResponse::success(DeploymentResponse::from(deployment)))
    }

    pub async fn list(
        &self,
        query: ListDeploymentsQuery,
    ) -> Result<ApiResponse<Vec<DeploymentResponse>>, AppError> {
        let status = query
            .status
            .as_deref()
            .map(|raw| {
                raw.parse::<DeploymentStatus>()
                    .map_err(|_| validation_error("status", "unknown deployment status"))
            })
            .transpose()?;

        let filters = DeploymentFilters {
            status,
            vehicle_id: query.vehicle_id,
            pilot_id: query.pilot_id,
            overdue: query.overdue,
        };

        let deployments = self.deployments.list(&filters).await?;
        let responses = deployments
            .into_iter()
            .map(DeploymentResponse::from)
            .collect();

        Ok(ApiResponse::success(responses))
    }

    /// Mantiene el estado del vehículo en acuerdo con su despliegue.
    /// El release es condicional: si otro proceso lo puso en charging
    /// u out_of_service, ese estado se respeta.
    async fn sync_vehicle_status(
        &self,
        vehicle_id: Uuid,
        target: DeploymentStatus,
    ) -> Result<(), AppError> {
        match target {
            DeploymentStatus::InProgress => {
                self.vehicles
                    .update_status(vehicle_id, VehicleStatus::Deployed)
                    .await?;
            }
            DeploymentStatus::Completed | DeploymentStatus::Cancelled => {
                let released = self
                    .vehicles
                    .release_status(vehicle_id, VehicleStatus::Deployed)
                    .await?;
                if !released {
                    log::debug!(
                        "ℹ️ Vehículo {} no estaba en deployed, se deja como está",
                        vehicle_id
                    );
                }
            }
            // El vehículo sigue ocupado: la parada de emergencia no lo libera
            DeploymentStatus::EmergencyStop | DeploymentStatus::Scheduled => {}
        }

        Ok(())
    }
}
