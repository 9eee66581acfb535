use time::OffsetDateTime;

/// Fixed classification label written by the threshold classifier.
pub const POSSIBLE_THEFT: &str = "POSSIBLE THEFT";

/// An alert row as fetched for the dashboard, with the consumer's `area`
/// attached by the same meter -> consumer join the readings use.
///
/// Alerts are immutable once written and always reflect the threshold in
/// effect at insertion time.
#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Alert {
    pub ts: OffsetDateTime,
    pub meter_id: i64,
    pub area: String,
    pub units: f64,
    pub alert_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub ts: OffsetDateTime,
    pub meter_id: i64,
    pub units: f64,
    pub alert_type: String,
}
