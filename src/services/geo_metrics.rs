//! Métricas geográficas de despliegues
//!
//! Funciones puras sobre la serie de pings de un despliegue: distancia
//! great-circle (haversine), velocidades, consumo de batería, huella de
//! carbono evitada y calidad de datos. El resultado es un snapshot
//! recalculable en cualquier momento; nunca es fuente de verdad.

use crate::models::history::{DeploymentMetrics, LocationPing};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distancia great-circle en kilómetros entre dos coordenadas
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Media incremental: incorpora un valor nuevo sin recalcular la serie.
/// `samples_before` es la cantidad de muestras ya incluidas en `previous`.
pub fn incremental_mean(previous: Option<f64>, samples_before: i64, value: f64) -> f64 {
    match previous {
        Some(mean) if samples_before > 0 => mean + (value - mean) / (samples_before + 1) as f64,
        _ => value,
    }
}

/// Calcula el snapshot de métricas sobre la serie de pings, que debe
/// venir ordenada por `recorded_at` ascendente. Con menos de 2 pings no
/// hay métricas: se devuelve None, nunca ceros.
pub fn compute_metrics(
    pings: &[LocationPing],
    carbon_factor_kg_per_km: f64,
    gap_threshold_minutes: i64,
) -> Option<DeploymentMetrics> {
    if pings.len() < 2 {
        return None;
    }

    let mut total_distance_km = 0.0;
    let mut gap_count = 0i64;

    for pair in pings.windows(2) {
        total_distance_km += haversine_km(
            pair[0].latitude,
            pair[0].longitude,
            pair[1].latitude,
            pair[1].longitude,
        );

        let separation = pair[1].recorded_at - pair[0].recorded_at;
        if separation.num_minutes() > gap_threshold_minutes {
            gap_count += 1;
        }
    }

    // Velocidades: solo los pings que reportan una
    let speeds: Vec<f64> = pings.iter().filter_map(|p| p.speed_kmh).collect();
    let max_speed_kmh = speeds.iter().copied().fold(0.0, f64::max);
    let average_speed_kmh = if speeds.is_empty() {
        0.0
    } else {
        speeds.iter().sum::<f64>() / speeds.len() as f64
    };

    // Batería: primera y última lectura no nula. Una lectura final mayor
    // que la inicial (recarga a mitad de recorrido) se reporta como
    // consumo cero y se marca como anomalía, nunca como consumo negativo.
    let battery_start = pings.iter().find_map(|p| p.battery_level);
    let battery_end = pings.iter().rev().find_map(|p| p.battery_level);
    let (battery_used, battery_anomaly) = match (battery_start, battery_end) {
        (Some(start), Some(end)) => {
            let used = start - end;
            if used < 0.0 {
                (0.0, true)
            } else {
                (used, false)
            }
        }
        _ => (0.0, false),
    };

    let energy_efficiency_km_per_pct = if battery_used > 0.0 {
        Some(total_distance_km / battery_used)
    } else {
        None
    };

    let accuracies: Vec<f64> = pings.iter().filter_map(|p| p.accuracy_m).collect();
    let average_accuracy_m = if accuracies.is_empty() {
        None
    } else {
        Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
    };

    let duration = pings[pings.len() - 1].recorded_at - pings[0].recorded_at;

    Some(DeploymentMetrics {
        total_distance_km,
        max_speed_kmh,
        average_speed_kmh,
        battery_start,
        battery_end,
        battery_used,
        battery_anomaly,
        energy_efficiency_km_per_pct,
        carbon_saved_kg: total_distance_km * carbon_factor_kg_per_km,
        total_duration_minutes: duration.num_minutes(),
        ping_count: pings.len() as i64,
        average_accuracy_m,
        gap_count,
        computed_at: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn ping(
        minute: i64,
        lat: f64,
        lon: f64,
        speed: Option<f64>,
        battery: Option<f64>,
        accuracy: Option<f64>,
    ) -> LocationPing {
        let t0: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        LocationPing {
            id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            latitude: lat,
            longitude: lon,
            address: None,
            accuracy_m: accuracy,
            speed_kmh: speed,
            battery_level: battery,
            altitude_m: None,
            recorded_at: t0 + chrono::Duration::minutes(minute),
            created_at: t0 + chrono::Duration::minutes(minute),
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // París -> Londres, ~343.5 km en línea great-circle
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 343.5).abs() < 1.5, "distancia inesperada: {}", d);

        // Punto contra sí mismo
        assert_eq!(haversine_km(48.8566, 2.3522, 48.8566, 2.3522), 0.0);
    }

    #[test]
    fn test_incremental_mean_matches_full_mean() {
        let mut mean = incremental_mean(None, 0, 10.0);
        assert_eq!(mean, 10.0);

        mean = incremental_mean(Some(mean), 1, 20.0);
        assert!((mean - 15.0).abs() < f64::EPSILON);

        mean = incremental_mean(Some(mean), 2, 30.0);
        assert!((mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_unavailable_below_two_pings() {
        assert!(compute_metrics(&[], 0.2, 5).is_none());

        let single = vec![ping(0, 48.85, 2.35, None, Some(90.0), None)];
        assert!(compute_metrics(&single, 0.2, 5).is_none());
    }

    #[test]
    fn test_metrics_full_trip() {
        // Tres pings: salida, mitad en movimiento, llegada detenido
        let pings = vec![
            ping(0, 48.8566, 2.3522, None, Some(90.0), Some(10.0)),
            ping(30, 48.8666, 2.3622, Some(40.0), Some(70.0), Some(20.0)),
            ping(60, 48.8666, 2.3622, Some(0.0), Some(60.0), None),
        ];

        let m = compute_metrics(&pings, 0.2, 5).unwrap();

        assert_eq!(m.battery_start, Some(90.0));
        assert_eq!(m.battery_end, Some(60.0));
        assert_eq!(m.battery_used, 30.0);
        assert!(!m.battery_anomaly);
        assert_eq!(m.total_duration_minutes, 60);
        assert_eq!(m.max_speed_kmh, 40.0);
        // Media de los pings que reportan velocidad: (40 + 0) / 2
        assert_eq!(m.average_speed_kmh, 20.0);
        assert!(m.max_speed_kmh >= m.average_speed_kmh);

        // El tercer ping no se movió, la distancia es solo el primer tramo
        assert!(m.total_distance_km > 0.0);
        assert!((m.carbon_saved_kg - m.total_distance_km * 0.2).abs() < 1e-12);
        assert_eq!(
            m.energy_efficiency_km_per_pct,
            Some(m.total_distance_km / 30.0)
        );

        assert_eq!(m.ping_count, 3);
        assert_eq!(m.average_accuracy_m, Some(15.0));
        // Separaciones de 30 min contra umbral de 5: dos huecos
        assert_eq!(m.gap_count, 2);
    }

    #[test]
    fn test_metrics_battery_recharge_is_anomaly_not_negative() {
        let pings = vec![
            ping(0, 48.85, 2.35, None, Some(50.0), None),
            ping(10, 48.86, 2.36, Some(30.0), Some(80.0), None),
        ];

        let m = compute_metrics(&pings, 0.2, 5).unwrap();

        assert_eq!(m.battery_used, 0.0);
        assert!(m.battery_anomaly);
        assert_eq!(m.energy_efficiency_km_per_pct, None);
    }

    #[test]
    fn test_metrics_without_speed_or_battery_readings() {
        let pings = vec![
            ping(0, 48.85, 2.35, None, None, None),
            ping(2, 48.86, 2.36, None, None, None),
        ];

        let m = compute_metrics(&pings, 0.2, 5).unwrap();

        assert_eq!(m.max_speed_kmh, 0.0);
        assert_eq!(m.average_speed_kmh, 0.0);
        assert_eq!(m.battery_start, None);
        assert_eq!(m.battery_used, 0.0);
        assert!(!m.battery_anomaly);
        assert_eq!(m.average_accuracy_m, None);
        assert_eq!(m.gap_count, 0);
    }

    #[test]
    fn test_metrics_idempotent() {
        let pings = vec![
            ping(0, 48.8566, 2.3522, Some(20.0), Some(95.0), Some(8.0)),
            ping(15, 48.8600, 2.3560, Some(35.0), Some(88.0), Some(12.0)),
            ping(45, 48.8700, 2.3700, Some(10.0), Some(80.0), None),
        ];

        let first = compute_metrics(&pings, 0.2, 5).unwrap();
        let mut second = compute_metrics(&pings, 0.2, 5).unwrap();
        // El sello de cálculo varía entre llamadas, el contenido no
        second.computed_at = first.computed_at;
        assert_eq!(first, second);
    }
}
