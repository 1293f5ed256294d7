//! DTOs de la API
//!
//! Requests con sus reglas de validación y responses con los valores
//! derivados ya calculados. Las entidades persistidas viven en models/.

pub mod deployment_dto;
pub mod history_dto;
pub mod maintenance_dto;

use serde::Serialize;

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}
