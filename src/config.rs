use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use tracing_subscriber::EnvFilter;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_RESERVATION_TTL_SECS: u64 = 3600;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_RETURNS_LOCATION_CODE: &str = "RET-STAGE";

/// One entry of the packing-material catalog.
#[derive(Clone, Debug, Deserialize)]
pub struct PackingMaterial {
    pub id: String,
    pub name: String,
    pub tare_weight_grams: i64,
}

fn default_packing_materials() -> Vec<PackingMaterial> {
    vec![
        PackingMaterial {
            id: "CARTON-S".to_string(),
            name: "Small carton".to_string(),
            tare_weight_grams: 120,
        },
        PackingMaterial {
            id: "CARTON-M".to_string(),
            name: "Medium carton".to_string(),
            tare_weight_grams: 250,
        },
        PackingMaterial {
            id: "CARTON-L".to_string(),
            name: "Large carton".to_string(),
            tare_weight_grams: 400,
        },
        PackingMaterial {
            id: "PALLET".to_string(),
            name: "Wooden pallet".to_string(),
            tare_weight_grams: 22000,
        },
    ]
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Allowed over-receipt as a fraction of the expected quantity
    /// (0.0 = receive at most what was announced).
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub over_receipt_tolerance: f64,

    /// Received lots start in QC hold instead of available.
    #[serde(default)]
    pub qc_hold_on_receipt: bool,

    /// Reservations older than this are released by the sweeper.
    #[serde(default = "default_reservation_ttl_secs")]
    pub reservation_ttl_secs: u64,

    /// How often the stale-reservation sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub reservation_sweep_interval_secs: u64,

    /// Location code where received returns are staged for grading.
    #[serde(default = "default_returns_location_code")]
    pub returns_location_code: String,

    /// Packing-material catalog offered to packing stations.
    #[serde(default = "default_packing_materials")]
    pub packing_materials: Vec<PackingMaterial>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_reservation_ttl_secs() -> u64 {
    DEFAULT_RESERVATION_TTL_SECS
}
fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_returns_location_code() -> String {
    DEFAULT_RETURNS_LOCATION_CODE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            over_receipt_tolerance: 0.0,
            qc_hold_on_receipt: false,
            reservation_ttl_secs: default_reservation_ttl_secs(),
            reservation_sweep_interval_secs: default_sweep_interval_secs(),
            returns_location_code: default_returns_location_code(),
            packing_materials: default_packing_materials(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn packing_material(&self, id: &str) -> Option<&PackingMaterial> {
        self.packing_materials.iter().find(|m| m.id == id)
    }
}

/// Loads configuration from layered files (`config/default`,
/// `config/{environment}`) and `APP__`-prefixed environment variables.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let settings = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
