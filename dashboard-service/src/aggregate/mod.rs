//! Pure derivation of the dashboard views from an already-materialized
//! reading set. Everything here is stateless: each call filters once and
//! recomputes from scratch. Empty input yields empty output, never an error.

use std::collections::BTreeMap;

use grid_client::domain::{Alert, Reading};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

/// Absence of a constraint is the explicit `All` sentinel, mirroring the
/// "All" choice in the dashboard's selectors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AreaFilter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterFilter {
    #[default]
    All,
    Only(i64),
}

/// Calendar-date range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Between { start: Date, end: Date },
}

/// Read-time constraint narrowing which readings participate in
/// aggregation. Never persisted; has no effect on stored data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub area: AreaFilter,
    pub meter: MeterFilter,
    pub dates: DateFilter,
}

impl Filter {
    /// Conjunction of the three predicates. Commutative, so application
    /// order never matters and re-applying is a no-op.
    pub fn matches(&self, meter_id: i64, area: &str, ts: OffsetDateTime) -> bool {
        let area_ok = match &self.area {
            AreaFilter::All => true,
            AreaFilter::Only(wanted) => area == wanted,
        };
        let meter_ok = match self.meter {
            MeterFilter::All => true,
            MeterFilter::Only(wanted) => meter_id == wanted,
        };
        let date_ok = match self.dates {
            DateFilter::All => true,
            DateFilter::Between { start, end } => {
                let d = ts.date();
                d >= start && d <= end
            }
        };
        area_ok && meter_ok && date_ok
    }
}

pub fn apply_filter(readings: &[Reading], filter: &Filter) -> Vec<Reading> {
    readings
        .iter()
        .filter(|r| filter.matches(r.meter_id, &r.area, r.ts))
        .cloned()
        .collect()
}

/// Trailing moving-average window for the smoothed trend. `Time` uses
/// actual elapsed time between readings; `Rows` uses a fixed row count.
/// Both behaviors ship because deployed dashboards used both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RollingWindow {
    Time(time::Duration),
    Rows(usize),
}

/// Whether the alert-trend view honors the active reading filter or always
/// reflects every alert. Deployed dashboards disagreed, so it is an explicit
/// configuration choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTrendScope {
    #[default]
    All,
    Filtered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub ts: OffsetDateTime,
    pub avg_units: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrendPoint {
    pub date: Date,
    pub count: u64,
}

/// The five derived views the dashboard renders.
#[derive(Debug, Clone, Default)]
pub struct DerivedViews {
    pub trend: Vec<TrendPoint>,
    pub heatmap: BTreeMap<(String, u8), f64>,
    pub peak_hours: Vec<(u8, f64)>,
    pub area_totals: BTreeMap<String, f64>,
    pub alert_trend: Vec<AlertTrendPoint>,
}

pub fn derive_views(
    readings: &[Reading],
    alerts: &[Alert],
    filter: &Filter,
    window: RollingWindow,
    scope: AlertTrendScope,
) -> DerivedViews {
    let filtered = apply_filter(readings, filter);

    DerivedViews {
        trend: smoothed_trend(&filtered, window),
        heatmap: heatmap(&filtered),
        peak_hours: peak_hours(&filtered),
        area_totals: area_totals(&filtered),
        alert_trend: alert_trend(alerts, filter, scope),
    }
}

/// Sort by timestamp ascending, then average `units` over a trailing
/// window ending at each reading (the reading itself always included).
pub fn smoothed_trend(readings: &[Reading], window: RollingWindow) -> Vec<TrendPoint> {
    let mut rows: Vec<&Reading> = readings.iter().collect();
    rows.sort_by_key(|r| r.ts);

    match window {
        RollingWindow::Rows(0) => Vec::new(),
        RollingWindow::Rows(n) => rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let start = (i + 1).saturating_sub(n);
                TrendPoint {
                    ts: r.ts,
                    avg_units: mean(&rows[start..=i]),
                }
            })
            .collect(),
        RollingWindow::Time(span) => {
            let span = span.max(time::Duration::ZERO);
            let mut out = Vec::with_capacity(rows.len());
            let mut start = 0usize;
            for (i, r) in rows.iter().enumerate() {
                // Rows are sorted, so the window is a contiguous run ending at i.
                while r.ts - rows[start].ts > span {
                    start += 1;
                }
                out.push(TrendPoint {
                    ts: r.ts,
                    avg_units: mean(&rows[start..=i]),
                });
            }
            out
        }
    }
}

fn mean(rows: &[&Reading]) -> f64 {
    let sum: f64 = rows.iter().map(|r| r.units).sum();
    sum / rows.len() as f64
}

/// Sum of `units` per `(area, hour-of-day)` cell. The hour is taken from
/// the stored timestamp as-is; no timezone normalization. Cells with no
/// readings are absent, not zero.
pub fn heatmap(readings: &[Reading]) -> BTreeMap<(String, u8), f64> {
    let mut cells: BTreeMap<(String, u8), f64> = BTreeMap::new();
    for r in readings {
        *cells.entry((r.area.clone(), r.ts.hour())).or_default() += r.units;
    }
    cells
}

/// Sum of `units` per hour-of-day across all areas, ordered by hour.
pub fn peak_hours(readings: &[Reading]) -> Vec<(u8, f64)> {
    let mut totals: BTreeMap<u8, f64> = BTreeMap::new();
    for r in readings {
        *totals.entry(r.ts.hour()).or_default() += r.units;
    }
    totals.into_iter().collect()
}

/// Sum of `units` per area.
pub fn area_totals(readings: &[Reading]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for r in readings {
        *totals.entry(r.area.clone()).or_default() += r.units;
    }
    totals
}

/// Alert count per calendar date, ordered by date. Under
/// `AlertTrendScope::Filtered` the active reading filter applies to alerts
/// too (the alert rows carry `area` from the same join).
pub fn alert_trend(alerts: &[Alert], filter: &Filter, scope: AlertTrendScope) -> Vec<AlertTrendPoint> {
    let mut counts: BTreeMap<Date, u64> = BTreeMap::new();
    for a in alerts {
        if scope == AlertTrendScope::Filtered && !filter.matches(a.meter_id, &a.area, a.ts) {
            continue;
        }
        *counts.entry(a.ts.date()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| AlertTrendPoint { date, count })
        .collect()
}
