use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::placement::{
    AffirmativePolicy, MatchConfig, MatchError, MatchWeights, OfferPolicy,
    DEFAULT_OFFER_WINDOW_HOURS,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub placement: PlacementConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            placement: PlacementConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Default scoring policy, offer window, and optional catalog seed.
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    pub matching: MatchConfig,
    pub offers: OfferPolicy,
    pub catalog_path: Option<PathBuf>,
}

impl PlacementConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = MatchWeights::default();
        let weights = MatchWeights {
            req: float_var("MATCH_WEIGHT_REQ", defaults.req)?,
            pref: float_var("MATCH_WEIGHT_PREF", defaults.pref)?,
            loc: float_var("MATCH_WEIGHT_LOC", defaults.loc)?,
            sector: float_var("MATCH_WEIGHT_SECTOR", defaults.sector)?,
            modality: float_var("MATCH_WEIGHT_MODALITY", defaults.modality)?,
        };

        let matching = MatchConfig {
            weights,
            require_all_required_skills: bool_var("MATCH_REQUIRE_ALL_REQUIRED", false)?,
            deadline_filter: bool_var("MATCH_DEADLINE_FILTER", true)?,
            capacity_filter: bool_var("MATCH_CAPACITY_FILTER", true)?,
            affirmative: AffirmativePolicy {
                rural_bonus: float_var(
                    "MATCH_RURAL_BONUS",
                    AffirmativePolicy::default().rural_bonus,
                )?,
            },
        };
        matching.validate().map_err(ConfigError::Matching)?;

        let window_hours = match env::var("OFFER_WINDOW_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::InvalidOfferWindow { value: raw })?,
            Err(_) => DEFAULT_OFFER_WINDOW_HOURS as u32,
        };

        let catalog_path = env::var("CATALOG_PATH")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            matching,
            offers: OfferPolicy::from_hours(window_hours),
            catalog_path,
        })
    }
}

fn float_var(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
    InvalidFlag { name: &'static str, value: String },
    InvalidOfferWindow { value: String },
    Matching(MatchError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a number (found '{value}')")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false (found '{value}')")
            }
            ConfigError::InvalidOfferWindow { value } => {
                write!(f, "OFFER_WINDOW_HOURS must be a positive integer (found '{value}')")
            }
            ConfigError::Matching(err) => write!(f, "match configuration rejected: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Matching(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidOfferWindow { .. } => None,
        }
    }
}
