// src/routes/mod.rs
pub mod auth_routes;
pub mod file_routes;
pub mod project_routes;
pub mod resource_routes;
pub mod team_routes;
