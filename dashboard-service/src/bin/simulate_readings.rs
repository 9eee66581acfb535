use std::sync::Arc;

use anyhow::{bail, Result};
use dashboard_service::{
    classify::ThresholdClassifier,
    config::AppConfig,
    ingest::{Ingestor, UnitsRange},
    observability,
    store::PgStore,
};
use sqlx::postgres::PgPoolOptions;
use std::env;

/// One-shot batch insert: record N simulated readings and exit.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: simulate_readings <count>");
    }
    let count: usize = args[1]
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid count '{}': {e}", args[1]))?;

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let store = Arc::new(PgStore::new(pool));
    let ingestor = Ingestor::new(
        store,
        Arc::new(ThresholdClassifier::new(cfg.alerts.threshold)),
        UnitsRange {
            min: cfg.simulation.units_min,
            max: cfg.simulation.units_max,
        },
    );

    let recorded = ingestor.simulate(count).await?;
    let alerts = recorded.iter().filter(|r| r.alert.is_some()).count();

    tracing::info!(recorded = recorded.len(), alerts, "simulation batch committed");
    Ok(())
}
