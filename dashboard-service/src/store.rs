use grid_client::domain::{Alert, NewAlert, NewReading, Reading};
use sqlx::PgPool;

use crate::error::DashboardError;

/// Narrow boundary to the durable store. The pool is passed in explicitly
/// and scoped to the state that owns it; nothing here holds ambient
/// connections.
///
/// `append_reading` must commit the reading and its conditional alert as one
/// atomic unit.
#[async_trait::async_trait]
pub trait MeterStore: Send + Sync {
    async fn meter_ids(&self) -> Result<Vec<i64>, DashboardError>;

    async fn append_reading(
        &self,
        reading: &NewReading,
        alert: Option<&NewAlert>,
    ) -> Result<(), DashboardError>;

    async fn readings(&self) -> Result<Vec<Reading>, DashboardError>;

    async fn alerts(&self) -> Result<Vec<Alert>, DashboardError>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MeterStore for PgStore {
    async fn meter_ids(&self) -> Result<Vec<i64>, DashboardError> {
        grid_client::db::fetch_meter_ids(&self.pool)
            .await
            .map_err(DashboardError::storage)
    }

    async fn append_reading(
        &self,
        reading: &NewReading,
        alert: Option<&NewAlert>,
    ) -> Result<(), DashboardError> {
        grid_client::db::insert_reading_with_alert(&self.pool, reading, alert)
            .await
            .map_err(DashboardError::storage)
    }

    async fn readings(&self) -> Result<Vec<Reading>, DashboardError> {
        grid_client::db::fetch_readings(&self.pool)
            .await
            .map_err(DashboardError::storage)
    }

    async fn alerts(&self) -> Result<Vec<Alert>, DashboardError> {
        grid_client::db::fetch_alerts(&self.pool)
            .await
            .map_err(DashboardError::storage)
    }
}
