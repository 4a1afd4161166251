pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use api::{DashboardApi, HttpDashboardApi};
pub use error::DashboardError;
pub use models::{DashboardScope, DashboardSnapshot, Role, ViewModel};
pub use services::loading::{LoadingContext, LoadingTier, TaskRunner};
pub use services::refresh::{RefreshController, RefreshOutcome};
