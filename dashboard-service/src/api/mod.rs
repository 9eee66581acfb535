//! HTTP boundary of the dashboard module: batch simulation, explicit
//! reading submission, the five derived views, and CSV export. Every GET
//! recomputes from a fresh fetch of the full reading set; nothing is cached
//! across requests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::aggregate::{
    self, AlertTrendScope, AreaFilter, DateFilter, Filter, MeterFilter, RollingWindow,
};
use crate::error::DashboardError;
use crate::export;
use crate::ingest::Ingestor;
use crate::store::MeterStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MeterStore>,
    pub ingestor: Arc<Ingestor>,
    pub window: RollingWindow,
    pub alert_scope: AlertTrendScope,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/simulate", post(simulate))
        .route("/readings", post(record_reading))
        .route("/views", get(views))
        .route("/export/readings.csv", get(export_readings))
        .route("/export/alerts.csv", get(export_alerts))
        .with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard api listening");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

enum ApiError {
    BadRequest(String),
    Internal(String),
    Dashboard(DashboardError),
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self::Dashboard(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::Dashboard(e) => {
                let status = match &e {
                    DashboardError::NoMetersConfigured => StatusCode::CONFLICT,
                    DashboardError::UnknownMeter(_) => StatusCode::NOT_FOUND,
                    DashboardError::Storage(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
        };
        (status, msg).into_response()
    }
}

/// Query-string form of the read-time filter. A missing parameter (or the
/// dashboard's literal "All" choice) means unconstrained.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub area: Option<String>,
    pub meter: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
}

fn parse_date(s: &str) -> Result<Date, ApiError> {
    let fmt = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(s, &fmt).map_err(|e| ApiError::BadRequest(format!("invalid date '{s}': {e}")))
}

fn build_filter(q: &FilterQuery) -> Result<Filter, ApiError> {
    let area = match q.area.as_deref() {
        None => AreaFilter::All,
        Some(a) if a.eq_ignore_ascii_case("all") => AreaFilter::All,
        Some(a) => AreaFilter::Only(a.to_string()),
    };
    let meter = match q.meter {
        None => MeterFilter::All,
        Some(id) => MeterFilter::Only(id),
    };
    let dates = match (q.start.as_deref(), q.end.as_deref()) {
        (None, None) => DateFilter::All,
        (Some(start), Some(end)) => DateFilter::Between {
            start: parse_date(start)?,
            end: parse_date(end)?,
        },
        _ => {
            return Err(ApiError::BadRequest(
                "start and end must be provided together".to_string(),
            ))
        }
    };

    Ok(Filter { area, meter, dates })
}

#[derive(Deserialize)]
struct SimulateQuery {
    #[serde(default = "default_count")]
    count: usize,
}

fn default_count() -> usize {
    1
}

#[derive(Serialize)]
struct SimulateResponse {
    recorded: usize,
    alerts: usize,
}

async fn simulate(
    State(state): State<AppState>,
    Query(q): Query<SimulateQuery>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let recorded = state.ingestor.simulate(q.count).await?;
    let alerts = recorded.iter().filter(|r| r.alert.is_some()).count();
    Ok(Json(SimulateResponse {
        recorded: recorded.len(),
        alerts,
    }))
}

#[derive(Deserialize)]
struct RecordReadingRequest {
    meter_id: i64,
    units: f64,
    /// RFC 3339; defaults to the current instant when omitted.
    #[serde(default, with = "time::serde::rfc3339::option")]
    ts: Option<OffsetDateTime>,
}

#[derive(Serialize)]
struct AlertDto {
    meter_id: i64,
    units: f64,
    alert_type: String,
    #[serde(with = "time::serde::rfc3339")]
    ts: OffsetDateTime,
}

#[derive(Serialize)]
struct RecordReadingResponse {
    meter_id: i64,
    units: f64,
    #[serde(with = "time::serde::rfc3339")]
    ts: OffsetDateTime,
    alert: Option<AlertDto>,
}

async fn record_reading(
    State(state): State<AppState>,
    Json(req): Json<RecordReadingRequest>,
) -> Result<Json<RecordReadingResponse>, ApiError> {
    let ts = req.ts.unwrap_or_else(OffsetDateTime::now_utc);
    let recorded = state.ingestor.record_reading(req.meter_id, req.units, ts).await?;

    Ok(Json(RecordReadingResponse {
        meter_id: recorded.reading.meter_id,
        units: recorded.reading.units,
        ts: recorded.reading.ts,
        alert: recorded.alert.map(|a| AlertDto {
            meter_id: a.meter_id,
            units: a.units,
            alert_type: a.alert_type,
            ts: a.ts,
        }),
    }))
}

#[derive(Serialize)]
struct Summary {
    total_readings: usize,
    total_units: f64,
    /// Absent on the empty set; the caller renders "no data" from this.
    avg_units: Option<f64>,
}

#[derive(Serialize)]
struct TrendPointDto {
    #[serde(with = "time::serde::rfc3339")]
    ts: OffsetDateTime,
    avg_units: f64,
}

#[derive(Serialize)]
struct HeatmapCellDto {
    area: String,
    hour: u8,
    units: f64,
}

#[derive(Serialize)]
struct PeakHourDto {
    hour: u8,
    units: f64,
}

#[derive(Serialize)]
struct AreaTotalDto {
    area: String,
    units: f64,
}

#[derive(Serialize)]
struct AlertTrendDto {
    date: String,
    count: u64,
}

#[derive(Serialize)]
struct ViewsResponse {
    summary: Summary,
    trend: Vec<TrendPointDto>,
    heatmap: Vec<HeatmapCellDto>,
    peak_hours: Vec<PeakHourDto>,
    area_totals: Vec<AreaTotalDto>,
    alert_trend: Vec<AlertTrendDto>,
}

async fn views(
    State(state): State<AppState>,
    Query(q): Query<FilterQuery>,
) -> Result<Json<ViewsResponse>, ApiError> {
    let filter = build_filter(&q)?;
    let readings = state.store.readings().await?;
    let alerts = state.store.alerts().await?;

    let filtered = aggregate::apply_filter(&readings, &filter);
    let derived = aggregate::derive_views(&readings, &alerts, &filter, state.window, state.alert_scope);
    metrics::counter!("view_recomputations_total").increment(1);

    let total_units: f64 = filtered.iter().map(|r| r.units).sum();
    let summary = Summary {
        total_readings: filtered.len(),
        total_units,
        avg_units: if filtered.is_empty() {
            None
        } else {
            Some(total_units / filtered.len() as f64)
        },
    };

    Ok(Json(ViewsResponse {
        summary,
        trend: derived
            .trend
            .into_iter()
            .map(|p| TrendPointDto { ts: p.ts, avg_units: p.avg_units })
            .collect(),
        heatmap: derived
            .heatmap
            .into_iter()
            .map(|((area, hour), units)| HeatmapCellDto { area, hour, units })
            .collect(),
        peak_hours: derived
            .peak_hours
            .into_iter()
            .map(|(hour, units)| PeakHourDto { hour, units })
            .collect(),
        area_totals: derived
            .area_totals
            .into_iter()
            .map(|(area, units)| AreaTotalDto { area, units })
            .collect(),
        alert_trend: derived
            .alert_trend
            .into_iter()
            .map(|p| AlertTrendDto { date: p.date.to_string(), count: p.count })
            .collect(),
    }))
}

async fn export_readings(
    State(state): State<AppState>,
    Query(q): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    let filter = build_filter(&q)?;
    let readings = state.store.readings().await?;
    let filtered = aggregate::apply_filter(&readings, &filter);

    let bytes = export::readings_csv(&filtered).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(csv_response(bytes))
}

async fn export_alerts(State(state): State<AppState>) -> Result<Response, ApiError> {
    let alerts = state.store.alerts().await?;

    let bytes = export::alerts_csv(&alerts).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(csv_response(bytes))
}

fn csv_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "text/csv")], bytes).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn absent_params_build_the_all_filter() {
        let filter = build_filter(&FilterQuery::default()).ok().unwrap();
        assert_eq!(filter, Filter::default());
    }

    #[test]
    fn literal_all_area_is_the_sentinel() {
        let q = FilterQuery {
            area: Some("All".to_string()),
            ..FilterQuery::default()
        };
        let filter = build_filter(&q).ok().unwrap();
        assert_eq!(filter.area, AreaFilter::All);
    }

    #[test]
    fn date_pair_builds_inclusive_range() {
        let q = FilterQuery {
            start: Some("2024-01-01".to_string()),
            end: Some("2024-01-31".to_string()),
            ..FilterQuery::default()
        };
        let filter = build_filter(&q).ok().unwrap();
        assert_eq!(
            filter.dates,
            DateFilter::Between {
                start: date!(2024-01-01),
                end: date!(2024-01-31),
            }
        );
    }

    #[test]
    fn lone_start_date_is_rejected() {
        let q = FilterQuery {
            start: Some("2024-01-01".to_string()),
            ..FilterQuery::default()
        };
        assert!(build_filter(&q).is_err());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let q = FilterQuery {
            start: Some("01/01/2024".to_string()),
            end: Some("2024-01-31".to_string()),
            ..FilterQuery::default()
        };
        assert!(build_filter(&q).is_err());
    }
}
