//! Services module
//!
//! Este módulo contiene la lógica de negocio pura de la aplicación:
//! solapamiento de ventanas de recursos y métricas geográficas. Son
//! funciones sin estado, testeables sin base de datos.

pub mod geo_metrics;
pub mod window_index;

pub use geo_metrics::*;
pub use window_index::*;
