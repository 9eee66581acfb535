use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{Alert, NewAlert, NewReading, Reading};

/// Fetch the full reading set, oldest first, with each row's `area` attached
/// via the meter -> consumer join. The dashboard recomputes every view from
/// this full scan on each interaction; there is no incremental path.
pub async fn fetch_readings(pool: &PgPool) -> Result<Vec<Reading>> {
    let rows = sqlx::query_as::<_, Reading>(
        r#"
        SELECT
            cs.reading_date AS ts,
            cs.meter_id,
            c.area,
            cs.units
        FROM consumption cs
        JOIN meter m ON cs.meter_id = m.meter_id
        JOIN consumer c ON m.consumer_id = c.consumer_id
        ORDER BY cs.reading_date
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch every alert, oldest first, area attached by the same join.
pub async fn fetch_alerts(pool: &PgPool) -> Result<Vec<Alert>> {
    let rows = sqlx::query_as::<_, Alert>(
        r#"
        SELECT
            a.alert_date AS ts,
            a.meter_id,
            c.area,
            a.units,
            a.alert_type
        FROM alerts a
        JOIN meter m ON a.meter_id = m.meter_id
        JOIN consumer c ON m.consumer_id = c.consumer_id
        ORDER BY a.alert_date
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The currently provisioned meter ids. Ingestion refuses to attribute a
/// reading when this set is empty.
pub async fn fetch_meter_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT meter_id FROM meter ORDER BY meter_id")
        .fetch_all(pool)
        .await?;

    Ok(ids)
}

/// Append one reading and, when the classifier produced one, its alert, as a
/// single transaction. A reader never observes the reading without its due
/// alert or vice versa.
pub async fn insert_reading_with_alert(
    pool: &PgPool,
    reading: &NewReading,
    alert: Option<&NewAlert>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO consumption (meter_id, reading_date, units) VALUES ($1, $2, $3)")
        .bind(reading.meter_id)
        .bind(reading.ts)
        .bind(reading.units)
        .execute(&mut *tx)
        .await?;

    if let Some(alert) = alert {
        sqlx::query(
            "INSERT INTO alerts (meter_id, units, alert_type, alert_date) VALUES ($1, $2, $3, $4)",
        )
        .bind(alert.meter_id)
        .bind(alert.units)
        .bind(&alert.alert_type)
        .bind(alert.ts)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
