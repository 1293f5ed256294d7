//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod deployment;
pub mod history;
pub mod maintenance;
pub mod pilot;
pub mod vehicle;
