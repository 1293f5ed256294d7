//! Utilidades de validación
//!
//! Este módulo contiene las reglas de validación que comparten los
//! controladores: coordenadas GPS y ventanas temporales.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Validar formato de coordenadas GPS
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || lat < -90.0 || lat > 90.0 {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &lat);
        error.add_param("range".into(), &"-90.0 to 90.0".to_string());
        return Err(error);
    }

    if !lng.is_finite() || lng < -180.0 || lng > 180.0 {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &lng);
        error.add_param("range".into(), &"-180.0 to 180.0".to_string());
        return Err(error);
    }

    Ok(())
}

/// Validar una ventana temporal `[start, end)`: el fin debe ser posterior
/// al inicio y la duración no puede exceder el máximo configurado.
pub fn validate_time_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_hours: Option<i64>,
) -> Result<(), ValidationError> {
    if end <= start {
        let mut error = ValidationError::new("time_window");
        error.add_param("start".into(), &start.to_rfc3339());
        error.add_param("end".into(), &end.to_rfc3339());
        error.add_param("reason".into(), &"end must be after start".to_string());
        return Err(error);
    }

    if let Some(max) = max_hours {
        let duration = end - start;
        if duration > chrono::Duration::hours(max) {
            let mut error = ValidationError::new("time_window");
            error.add_param("max_hours".into(), &max);
            error.add_param("actual_minutes".into(), &duration.num_minutes());
            error.add_param("reason".into(), &"window exceeds maximum length".to_string());
            return Err(error);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(45.0, -75.0).is_ok());
        assert!(validate_coordinates(91.0, -75.0).is_err());
        assert!(validate_coordinates(45.0, -181.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_validate_time_window() {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

        assert!(validate_time_window(start, end, Some(24)).is_ok());
        // Fin antes del inicio
        assert!(validate_time_window(end, start, Some(24)).is_err());
        // Inicio == fin no es una ventana válida
        assert!(validate_time_window(start, start, Some(24)).is_err());
        // Excede el máximo configurado
        let far_end = Utc.with_ymd_and_hms(2026, 3, 12, 10, 0, 0).unwrap();
        assert!(validate_time_window(start, far_end, Some(24)).is_err());
        // Sin máximo: solo exige orden
        assert!(validate_time_window(start, far_end, None).is_ok());
    }
}
