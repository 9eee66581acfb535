use std::sync::Arc;

use anyhow::Result;
use dashboard_service::{
    api::{self, AppState},
    classify::ThresholdClassifier,
    config::AppConfig,
    ingest::{Ingestor, UnitsRange},
    metrics_server, observability,
    store::PgStore,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let store: Arc<PgStore> = Arc::new(PgStore::new(pool));
    let classifier = Arc::new(ThresholdClassifier::new(cfg.alerts.threshold));
    let ingestor = Arc::new(Ingestor::new(
        store.clone(),
        classifier,
        UnitsRange {
            min: cfg.simulation.units_min,
            max: cfg.simulation.units_max,
        },
    ));

    tracing::info!(
        threshold = cfg.alerts.threshold,
        "starting consumption dashboard service"
    );

    let state = AppState {
        store,
        ingestor,
        window: cfg.views.rolling.window(),
        alert_scope: cfg.views.alert_trend_scope,
    };

    api::serve(state, &cfg.http.bind_addr).await
}
