use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    BIND_ADDR, CATALOG_URL, MAPPING_PATH, PAGE_DELAY_MS, REQUEST_TIMEOUT_SECS, TARGET_COUNT,
};

/// Runtime settings. Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "scrap", version, about = "Scrapes catalog item ids by category tag")]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "SCRAP_BIND", default_value = BIND_ADDR)]
    pub bind: String,

    /// CSV file with a `tag,taxonomy_id` header.
    #[arg(long, env = "SCRAP_MAPPING", default_value = MAPPING_PATH)]
    pub mapping: PathBuf,

    /// Catalog search endpoint.
    #[arg(long, env = "SCRAP_CATALOG_URL", default_value = CATALOG_URL)]
    pub catalog_url: String,

    /// Maximum number of ids returned per scrape.
    #[arg(long, env = "SCRAP_TARGET_COUNT", default_value_t = TARGET_COUNT)]
    pub target_count: usize,

    /// Per-request timeout for catalog calls.
    #[arg(long, env = "SCRAP_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Pause before each follow-up page request.
    #[arg(long, env = "SCRAP_PAGE_DELAY_MS", default_value_t = PAGE_DELAY_MS)]
    pub page_delay_ms: u64,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}
