//! Flat tabular export of the raw rows behind the dashboard: the filtered
//! readings as CSV and the alert log as CSV. One row per record, no nesting.

use anyhow::Result;
use grid_client::domain::{Alert, Reading};
use time::format_description::well_known::Rfc3339;

pub fn readings_csv(readings: &[Reading]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["meter_id", "area", "units", "ts"])?;
    for r in readings {
        wtr.write_record([
            r.meter_id.to_string(),
            r.area.clone(),
            r.units.to_string(),
            r.ts.format(&Rfc3339)?,
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {e}"))
}

pub fn alerts_csv(alerts: &[Alert]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["meter_id", "area", "units", "alert_type", "ts"])?;
    for a in alerts {
        wtr.write_record([
            a.meter_id.to_string(),
            a.area.clone(),
            a.units.to_string(),
            a.alert_type.clone(),
            a.ts.format(&Rfc3339)?,
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {e}"))
}
