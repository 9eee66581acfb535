pub mod consumption_queries;

pub use consumption_queries::{
    fetch_alerts, fetch_meter_ids, fetch_readings, insert_reading_with_alert,
};
