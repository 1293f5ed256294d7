//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación
//! y generación de referencias legibles.

pub mod errors;
pub mod ids;
pub mod validation;
