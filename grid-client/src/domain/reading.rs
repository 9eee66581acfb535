use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Consumer {
    pub consumer_id: i64,
    pub name: String,
    pub area: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Meter {
    pub meter_id: i64,
    pub consumer_id: i64,
    pub meter_type: String,
}

/// One consumption reading joined through meter -> consumer to carry the
/// consumer's `area`. This is the row shape every aggregation consumes.
#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Reading {
    pub ts: OffsetDateTime,
    pub meter_id: i64,
    pub area: String,
    pub units: f64,
}

/// The write shape: what ingestion appends to the consumption table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub ts: OffsetDateTime,
    pub meter_id: i64,
    pub units: f64,
}
