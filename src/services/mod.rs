//! Business logic services.

pub mod auth_service;
pub mod workflow_service;
