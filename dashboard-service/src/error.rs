/// Failures surfaced by ingestion and storage access.
///
/// An empty dataset is deliberately not represented here: filtering or
/// aggregating over zero rows is a valid terminal state and every view
/// returns an empty collection for it.
#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error("no meters configured; provision at least one meter before recording readings")]
    NoMetersConfigured,
    #[error("unknown meter id {0}")]
    UnknownMeter(i64),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl DashboardError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}
