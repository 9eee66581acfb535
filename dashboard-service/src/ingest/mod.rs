//! Recording of new readings. Ingestion owns the write path only: it asks
//! the classifier whether the reading deserves an alert and hands both to
//! the store as one atomic append.

use std::sync::Arc;

use grid_client::domain::{NewAlert, NewReading};
use rand::Rng;
use time::OffsetDateTime;

use crate::classify::Classifier;
use crate::error::DashboardError;
use crate::store::MeterStore;

/// Bounds for the simulated uniform draw standing in for a real meter feed.
#[derive(Debug, Clone, Copy)]
pub struct UnitsRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct RecordedReading {
    pub reading: NewReading,
    pub alert: Option<NewAlert>,
}

pub struct Ingestor {
    store: Arc<dyn MeterStore>,
    classifier: Arc<dyn Classifier>,
    units: UnitsRange,
}

impl Ingestor {
    pub fn new(store: Arc<dyn MeterStore>, classifier: Arc<dyn Classifier>, units: UnitsRange) -> Self {
        Self {
            store,
            classifier,
            units,
        }
    }

    /// Record one reading for `meter_id`. The reading and its conditional
    /// alert commit together or not at all; any storage failure surfaces
    /// immediately with nothing written for this call.
    pub async fn record_reading(
        &self,
        meter_id: i64,
        units: f64,
        ts: OffsetDateTime,
    ) -> Result<RecordedReading, DashboardError> {
        let meters = self.store.meter_ids().await?;
        if meters.is_empty() {
            return Err(DashboardError::NoMetersConfigured);
        }
        if !meters.contains(&meter_id) {
            return Err(DashboardError::UnknownMeter(meter_id));
        }

        let reading = NewReading { ts, meter_id, units };
        let alert = self.classifier.classify(&reading);

        self.store.append_reading(&reading, alert.as_ref()).await?;

        metrics::counter!("readings_recorded_total").increment(1);
        if let Some(alert) = &alert {
            metrics::counter!("theft_alerts_total").increment(1);
            tracing::warn!(
                meter_id,
                units,
                alert_type = %alert.alert_type,
                "reading exceeded theft threshold"
            );
        }

        Ok(RecordedReading { reading, alert })
    }

    /// Record `count` simulated readings sequentially, each against a
    /// uniformly chosen meter with units drawn from the configured range.
    /// Calls are independently atomic: a failure midway leaves every prior
    /// reading committed.
    pub async fn simulate(&self, count: usize) -> Result<Vec<RecordedReading>, DashboardError> {
        let meters = self.store.meter_ids().await?;
        if meters.is_empty() {
            return Err(DashboardError::NoMetersConfigured);
        }

        let mut recorded = Vec::with_capacity(count);
        for _ in 0..count {
            let (meter_id, units) = {
                let mut rng = rand::thread_rng();
                let meter_id = meters[rng.gen_range(0..meters.len())];
                let units = rng.gen_range(self.units.min..=self.units.max);
                (meter_id, round_units(units))
            };
            recorded.push(
                self.record_reading(meter_id, units, OffsetDateTime::now_utc())
                    .await?,
            );
        }

        tracing::info!(count = recorded.len(), "simulated readings recorded");
        Ok(recorded)
    }
}

/// Meters report to two decimal places.
fn round_units(units: f64) -> f64 {
    (units * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classify::ThresholdClassifier;
    use grid_client::domain::{Alert, Reading, POSSIBLE_THEFT};
    use std::sync::Mutex;
    use time::macros::datetime;

    /// In-memory store used across the service tests. Appends the reading
    /// and its alert under one lock, so a pair is observed together or not
    /// at all. `fail_after` makes the nth append fail to exercise the
    /// batch-failure contract.
    pub(crate) struct MemStore {
        pub meters: Vec<i64>,
        pub readings: Mutex<Vec<NewReading>>,
        pub alerts: Mutex<Vec<NewAlert>>,
        pub fail_after: Option<usize>,
    }

    impl MemStore {
        pub fn with_meters(meters: Vec<i64>) -> Self {
            Self {
                meters,
                readings: Mutex::new(Vec::new()),
                alerts: Mutex::new(Vec::new()),
                fail_after: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl MeterStore for MemStore {
        async fn meter_ids(&self) -> Result<Vec<i64>, DashboardError> {
            Ok(self.meters.clone())
        }

        async fn append_reading(
            &self,
            reading: &NewReading,
            alert: Option<&NewAlert>,
        ) -> Result<(), DashboardError> {
            let mut readings = self.readings.lock().unwrap();
            if let Some(limit) = self.fail_after {
                if readings.len() >= limit {
                    return Err(DashboardError::Storage("connection reset".to_string()));
                }
            }
            readings.push(reading.clone());
            if let Some(alert) = alert {
                self.alerts.lock().unwrap().push(alert.clone());
            }
            Ok(())
        }

        async fn readings(&self) -> Result<Vec<Reading>, DashboardError> {
            Ok(self
                .readings
                .lock()
                .unwrap()
                .iter()
                .map(|r| Reading {
                    ts: r.ts,
                    meter_id: r.meter_id,
                    area: "Chennai".to_string(),
                    units: r.units,
                })
                .collect())
        }

        async fn alerts(&self) -> Result<Vec<Alert>, DashboardError> {
            Ok(self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .map(|a| Alert {
                    ts: a.ts,
                    meter_id: a.meter_id,
                    area: "Chennai".to_string(),
                    units: a.units,
                    alert_type: a.alert_type.clone(),
                })
                .collect())
        }
    }

    fn ingestor(store: Arc<MemStore>) -> Ingestor {
        Ingestor::new(
            store,
            Arc::new(ThresholdClassifier::new(250.0)),
            UnitsRange { min: 1.0, max: 400.0 },
        )
    }

    #[tokio::test]
    async fn refuses_to_record_with_no_meters() {
        let store = Arc::new(MemStore::with_meters(Vec::new()));
        let ing = ingestor(store.clone());

        let err = ing
            .record_reading(101, 10.0, datetime!(2024-01-01 08:00:00 UTC))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::NoMetersConfigured));
        assert!(store.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refuses_unknown_meter() {
        let store = Arc::new(MemStore::with_meters(vec![101]));
        let ing = ingestor(store.clone());

        let err = ing
            .record_reading(999, 10.0, datetime!(2024-01-01 08:00:00 UTC))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::UnknownMeter(999)));
        assert!(store.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pairs_alert_with_reading_above_threshold() {
        let store = Arc::new(MemStore::with_meters(vec![101, 102]));
        let ing = ingestor(store.clone());

        ing.record_reading(101, 300.0, datetime!(2024-01-01 08:00:00 UTC))
            .await
            .unwrap();
        ing.record_reading(102, 50.0, datetime!(2024-01-01 08:30:00 UTC))
            .await
            .unwrap();

        let readings = store.readings.lock().unwrap();
        let alerts = store.alerts.lock().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].meter_id, 101);
        assert_eq!(alerts[0].units, 300.0);
        assert_eq!(alerts[0].alert_type, POSSIBLE_THEFT);
        assert_eq!(alerts[0].ts, datetime!(2024-01-01 08:00:00 UTC));
    }

    #[tokio::test]
    async fn simulate_records_requested_count_within_range() {
        let store = Arc::new(MemStore::with_meters(vec![101, 102, 103]));
        let ing = Ingestor::new(
            store.clone(),
            Arc::new(ThresholdClassifier::new(250.0)),
            UnitsRange { min: 5.0, max: 10.0 },
        );

        let recorded = ing.simulate(10).await.unwrap();
        assert_eq!(recorded.len(), 10);

        let readings = store.readings.lock().unwrap();
        assert_eq!(readings.len(), 10);
        for r in readings.iter() {
            assert!(r.units >= 5.0 && r.units <= 10.0);
            assert!(store.meters.contains(&r.meter_id));
        }
        // Nothing in range can cross the threshold.
        assert!(store.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_failure_keeps_prior_commits() {
        let mut store = MemStore::with_meters(vec![101]);
        store.fail_after = Some(3);
        let store = Arc::new(store);
        let ing = ingestor(store.clone());

        let err = ing.simulate(10).await.unwrap_err();
        assert!(matches!(err, DashboardError::Storage(_)));
        assert_eq!(store.readings.lock().unwrap().len(), 3);
    }
}
