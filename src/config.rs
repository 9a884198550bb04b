use crate::cli::Cli;
use crate::error::{RankingError, RankingResult};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

// All settings may be configured via environment variables. Example:
// CACHE_TIMEOUT_MINUTES="10" would set cache_timeout_minutes to 10.
// Command line flags take precedence over the environment.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_ranking_url")]
    pub ranking_url: String,
    #[serde(default = "default_http_timeout_sec")]
    pub http_timeout_sec: u64,
    // No default: a missing value would silently disable caching.
    pub cache_timeout_minutes: u64,
}

impl Settings {
    pub fn new(cli: Cli) -> RankingResult<Self> {
        let mut figment = Figment::new();
        if Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            println!(
                "\n######################################\n\
                   ##   Found '.env.local.yaml' file,  ##\n\
                   ##   loading local configuration.   ##\n\
                   ######################################\n\
                "
            );
            figment = figment.merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE));
        }

        Settings::from_figment(
            figment
                .merge(Env::raw().only(&[
                    "trace_level",
                    "bind_address",
                    "ranking_url",
                    "http_timeout_sec",
                    "cache_timeout_minutes",
                ]))
                .merge(Serialized::defaults(cli)),
        )
    }

    pub fn from_figment(figment: Figment) -> RankingResult<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> RankingResult<()> {
        if self.cache_timeout_minutes == 0 {
            return Err(RankingError::Config(
                "cache_timeout_minutes must be greater than zero".to_string(),
            ));
        }
        if self.http_timeout_sec == 0 {
            return Err(RankingError::Config(
                "http_timeout_sec must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_minutes * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_sec)
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str.to_uppercase().as_str() {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ranking_url() -> String {
    "https://live-tennis.eu/en/wta-live-ranking".to_string()
}

fn default_http_timeout_sec() -> u64 {
    10
}
