//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y los parámetros
//! operativos de la flota. Los parámetros de dominio tienen defaults;
//! los del servidor deben venir del entorno.

use std::env;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Duración máxima permitida de una ventana de despliegue
    pub max_deployment_hours: i64,
    /// Factor de CO2 evitado por kilómetro recorrido
    pub carbon_factor_kg_per_km: f64,
    /// Separación entre pings que cuenta como hueco de telemetría
    pub telemetry_gap_minutes: i64,
    /// Tarifa usada para el costo real al completar
    pub cost_per_km: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            max_deployment_hours: parse_or("MAX_DEPLOYMENT_HOURS", 24),
            carbon_factor_kg_per_km: parse_or("CARBON_FACTOR_KG_PER_KM", 0.2),
            telemetry_gap_minutes: parse_or("TELEMETRY_GAP_MINUTES", 5),
            cost_per_km: parse_or("COST_PER_KM", 0.35),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rechaza parámetros operativos sin sentido antes de arrancar
    pub fn validate(&self) -> Result<(), String> {
        if self.max_deployment_hours <= 0 {
            return Err("MAX_DEPLOYMENT_HOURS must be positive".to_string());
        }
        if self.carbon_factor_kg_per_km < 0.0 {
            return Err("CARBON_FACTOR_KG_PER_KM cannot be negative".to_string());
        }
        if self.telemetry_gap_minutes <= 0 {
            return Err("TELEMETRY_GAP_MINUTES must be positive".to_string());
        }
        if self.cost_per_km < 0.0 {
            return Err("COST_PER_KM cannot be negative".to_string());
        }
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_drops_empty() {
        let origins = parse_origins("https://a.test, https://b.test ,,");
        assert_eq!(origins, vec!["https://a.test", "https://b.test"]);
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = EnvironmentConfig {
            environment: "test".to_string(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            cors_origins: vec![],
            max_deployment_hours: 24,
            carbon_factor_kg_per_km: 0.2,
            telemetry_gap_minutes: 5,
            cost_per_km: 0.35,
        };
        assert!(config.validate().is_ok());

        config.max_deployment_hours = 0;
        assert!(config.validate().is_err());
    }
}
