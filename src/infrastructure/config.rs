use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub database: DatabaseSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_connect_retry_secs")]
    pub connect_retry_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub http: HttpSettings,
    pub report: ReportSettings,
    #[serde(default)]
    pub forecast: ForecastSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportSettings {
    pub output_path: String,
    #[serde(default = "default_merge_sources")]
    pub merge_sources: bool,
    #[serde(default = "default_report_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_tolerance_minutes")]
    pub tolerance_minutes: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastSettings {
    #[serde(default = "default_station")]
    pub station: String,
    #[serde(default = "default_forecast_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            station: default_station(),
            interval_minutes: default_forecast_interval_minutes(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_attempts() -> u32 {
    12
}

fn default_connect_retry_secs() -> u64 {
    5
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_merge_sources() -> bool {
    true
}

fn default_report_interval_minutes() -> u64 {
    60
}

fn default_tolerance_minutes() -> f64 {
    crate::application::align::DEFAULT_TOLERANCE_MINUTES
}

fn default_station() -> String {
    "10838".to_string()
}

fn default_forecast_interval_minutes() -> u64 {
    60
}

pub fn load_database_config() -> anyhow::Result<DatabaseConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/database"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/service"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_defaults() {
        let raw = r#"
            [report]
            output_path = "reports/summary.svg"
        "#;
        let config: ServiceConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.http.bind_addr, "0.0.0.0:8080");
        assert!(config.report.merge_sources);
        assert_eq!(config.report.interval_minutes, 60);
        assert_eq!(config.report.tolerance_minutes, 5.5);
        assert_eq!(config.forecast.station, "10838");
        assert_eq!(config.forecast.interval_minutes, 60);
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let raw = r#"
            [http]
            bind_addr = "127.0.0.1:9000"

            [report]
            output_path = "out.svg"
            merge_sources = false
            tolerance_minutes = 5.0

            [forecast]
            station = "10865"
            interval_minutes = 30
        "#;
        let config: ServiceConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.http.bind_addr, "127.0.0.1:9000");
        assert!(!config.report.merge_sources);
        assert_eq!(config.report.tolerance_minutes, 5.0);
        assert_eq!(config.forecast.station, "10865");
        assert_eq!(config.forecast.interval_minutes, 30);
    }

    #[test]
    fn test_database_config_defaults() {
        let raw = r#"
            [database]
            host = "localhost"
            port = 5432
            user = "hometemp"
            password = "secret"
            dbname = "hometemp"
        "#;
        let config: DatabaseConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.connect_attempts, 12);
        assert_eq!(config.database.connect_retry_secs, 5);
    }
}
