pub mod deployment_routes;
pub mod maintenance_routes;
