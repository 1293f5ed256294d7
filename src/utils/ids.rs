//! Generación de referencias legibles
//!
//! Este módulo formatea los identificadores legibles de despliegues y
//! mantenimientos: prefijo de tipo, secuencia diaria y sello de fecha.
//! La asignación de la secuencia ocurre en el repositorio, dentro de la
//! misma transacción que el INSERT; aquí solo se formatea.

use chrono::NaiveDate;

/// Referencia de despliegue: `DEP_###_YYMMDD`
pub fn deployment_reference(sequence: i64, date: NaiveDate) -> String {
    format!("DEP_{:03}_{}", sequence, date.format("%y%m%d"))
}

/// Referencia de mantenimiento: `MAINT_YYMMDD_###`
pub fn maintenance_reference(date: NaiveDate, sequence: i64) -> String {
    format!("MAINT_{}_{:03}", date.format("%y%m%d"), sequence)
}

/// Verificar si un string tiene forma de referencia de despliegue
pub fn looks_like_deployment_reference(value: &str) -> bool {
    let mut parts = value.splitn(3, '_');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some("DEP"), Some(seq), Some(date))
            if seq.len() >= 3
                && seq.chars().all(|c| c.is_ascii_digit())
                && date.len() == 6
                && date.chars().all(|c| c.is_ascii_digit())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    #[test]
    fn test_deployment_reference_format() {
        assert_eq!(deployment_reference(1, day()), "DEP_001_260823");
        assert_eq!(deployment_reference(42, day()), "DEP_042_260823");
        // La secuencia crece más allá de tres dígitos sin truncarse
        assert_eq!(deployment_reference(1205, day()), "DEP_1205_260823");
    }

    #[test]
    fn test_maintenance_reference_format() {
        assert_eq!(maintenance_reference(day(), 7), "MAINT_260823_007");
        assert_eq!(maintenance_reference(day(), 310), "MAINT_260823_310");
    }

    #[test]
    fn test_looks_like_deployment_reference() {
        assert!(looks_like_deployment_reference("DEP_001_260823"));
        assert!(looks_like_deployment_reference("DEP_1205_260823"));
        assert!(!looks_like_deployment_reference("MAINT_260823_007"));
        assert!(!looks_like_deployment_reference("DEP_xx_260823"));
        assert!(!looks_like_deployment_reference("DEP_001_26082"));
        assert!(!looks_like_deployment_reference("random"));
    }
}
