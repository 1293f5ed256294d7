//! Controladores de negocio
//!
//! Cada controlador arma sus repositorios desde el pool y expone las
//! operaciones del dominio. Los handlers de rutas los construyen por
//! request; no guardan estado propio.

pub mod deployment_controller;
pub mod history_controller;
pub mod maintenance_controller;

pub use deployment_controller::DeploymentController;
pub use history_controller::HistoryController;
pub use maintenance_controller::MaintenanceController;
