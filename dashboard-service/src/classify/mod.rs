use grid_client::domain::{NewAlert, NewReading, POSSIBLE_THEFT};

/// Turns a reading into an alert, or not. Kept separate from ingestion so
/// the alerting policy can change without touching storage code; ingestion
/// persists whatever the classifier returns, in the same transaction as the
/// reading.
pub trait Classifier: Send + Sync {
    fn classify(&self, reading: &NewReading) -> Option<NewAlert>;
}

/// Static-cutoff policy: strictly above `threshold` is flagged as possible
/// theft. A reading exactly at the threshold is not flagged.
pub struct ThresholdClassifier {
    threshold: f64,
}

impl ThresholdClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Classifier for ThresholdClassifier {
    fn classify(&self, reading: &NewReading) -> Option<NewAlert> {
        if reading.units > self.threshold {
            Some(NewAlert {
                ts: reading.ts,
                meter_id: reading.meter_id,
                units: reading.units,
                alert_type: POSSIBLE_THEFT.to_string(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(units: f64) -> NewReading {
        NewReading {
            ts: datetime!(2024-01-01 08:00:00 UTC),
            meter_id: 101,
            units,
        }
    }

    #[test]
    fn flags_units_above_threshold() {
        let classifier = ThresholdClassifier::new(250.0);

        let alert = classifier.classify(&reading(300.0)).expect("should flag");
        assert_eq!(alert.meter_id, 101);
        assert_eq!(alert.units, 300.0);
        assert_eq!(alert.alert_type, POSSIBLE_THEFT);
        assert_eq!(alert.ts, datetime!(2024-01-01 08:00:00 UTC));
    }

    #[test]
    fn ignores_units_at_or_below_threshold() {
        let classifier = ThresholdClassifier::new(250.0);

        assert!(classifier.classify(&reading(50.0)).is_none());
        // The cutoff is strict.
        assert!(classifier.classify(&reading(250.0)).is_none());
    }
}
