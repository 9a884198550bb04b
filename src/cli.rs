use clap::Parser;
use serde::Serialize;

#[derive(Debug, Default, Parser, Serialize)]
pub struct Cli {
    /// Address the HTTP server listens on, e.g. 127.0.0.1:8080
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    /// Sliding expiration of the cached ranking, in minutes
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timeout_minutes: Option<u64>,
    /// Live ranking page to scrape
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_url: Option<String>,
}
