//! Infrastructure layer - Store backends, invalidation engine and services

pub mod invalidation;
pub mod logging;
pub mod observability;
pub mod services;
pub mod store;
