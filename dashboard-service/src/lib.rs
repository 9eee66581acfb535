pub mod aggregate;
pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod metrics_server;
pub mod observability;
pub mod store;

pub use error::DashboardError;
