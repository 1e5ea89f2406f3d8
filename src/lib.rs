//! Catalog scraper service.
//! Resolves a category tag to a catalog taxonomy id and pages through the
//! catalog search endpoint until enough item ids are collected.

mod error;
mod macros;

pub mod config;
pub mod parse;
pub mod process;
pub mod request;
pub mod server;
pub mod taxonomy;

pub use error::{Error, FetchError, Result};

/// Default search endpoint for the catalog.
pub const CATALOG_URL: &str = "https://catalog.roblox.com/v2/search/items/details";
/// Mapping file, relative to the working directory.
pub const MAPPING_PATH: &str = "taxonomy_mapping.csv";
pub const BIND_ADDR: &str = "0.0.0.0:5000";

/// How many ids a single scrape collects.
pub const TARGET_COUNT: usize = 500;
/// Largest page size the catalog accepts.
pub const PAGE_LIMIT: u32 = 120;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
/// Pause before each follow-up page request.
pub const PAGE_DELAY_MS: u64 = 1000;

// Fixed search filters.
const MIN_PRICE: u32 = 15;
const SALES_TYPE_FILTER: u32 = 1;
const SORT_TYPE: u32 = 2;
const SORT_AGGREGATION: u32 = 1;
