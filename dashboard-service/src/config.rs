use serde::Deserialize;
use std::fs;

use crate::aggregate::{AlertTrendScope, RollingWindow};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

/// Theft-alert cutoff. Alerts written under an older threshold are never
/// revisited when this changes.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { threshold: default_threshold() }
    }
}

/// Bounds for the uniform draw the reading simulator uses in place of a real
/// meter feed.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_units_min")]
    pub units_min: f64,
    #[serde(default = "default_units_max")]
    pub units_max: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            units_min: default_units_min(),
            units_max: default_units_max(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollingMode {
    Time,
    Rows,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollingConfig {
    #[serde(default = "default_rolling_mode")]
    pub mode: RollingMode,
    #[serde(default = "default_rolling_hours")]
    pub hours: i64,
    #[serde(default = "default_rolling_rows")]
    pub rows: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            mode: default_rolling_mode(),
            hours: default_rolling_hours(),
            rows: default_rolling_rows(),
        }
    }
}

impl RollingConfig {
    pub fn window(&self) -> RollingWindow {
        match self.mode {
            RollingMode::Time => RollingWindow::Time(time::Duration::hours(self.hours)),
            RollingMode::Rows => RollingWindow::Rows(self.rows),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewsConfig {
    #[serde(default)]
    pub rolling: RollingConfig,
    #[serde(default)]
    pub alert_trend_scope: AlertTrendScope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

fn default_threshold() -> f64 {
    250.0
}

fn default_units_min() -> f64 {
    1.0
}

fn default_units_max() -> f64 {
    400.0
}

fn default_rolling_mode() -> RollingMode {
    RollingMode::Time
}

fn default_rolling_hours() -> i64 {
    3
}

fn default_rolling_rows() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            uri = "postgres://localhost/grid"
            max_connections = 4

            [http]
            bind_addr = "127.0.0.1:8080"
            "#,
        )
        .expect("minimal config should parse");

        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.alerts.threshold, 250.0);
        assert_eq!(cfg.simulation.units_min, 1.0);
        assert_eq!(cfg.simulation.units_max, 400.0);
        assert_eq!(cfg.views.rolling.mode, RollingMode::Time);
        assert_eq!(cfg.views.rolling.hours, 3);
        assert_eq!(cfg.views.alert_trend_scope, AlertTrendScope::All);
    }

    #[test]
    fn rolling_rows_mode_is_selectable() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            uri = "postgres://localhost/grid"
            max_connections = 4

            [http]
            bind_addr = "127.0.0.1:8080"

            [views]
            alert_trend_scope = "filtered"

            [views.rolling]
            mode = "rows"
            rows = 5
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.views.rolling.window(), RollingWindow::Rows(5));
        assert_eq!(cfg.views.alert_trend_scope, AlertTrendScope::Filtered);
    }
}
