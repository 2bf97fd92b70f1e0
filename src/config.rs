//! Configuration file for the counter service.
//!
//! ```toml
//! read_mode = "read-back"
//!
//! [http]
//! bind_address = "127.0.0.1:12344"
//!
//! [log]
//! mode = "stderr-terminal"
//! level = "info"
//!
//! [store]
//! kind = "dynamodb"
//! table_name = "VisitorCounterDB"
//! region = "us-east-1"
//! ```

use crate::handler::ReadMode;
use anyhow::Context;
use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub read_mode: ReadMode,
    #[serde(default)]
    pub http: ConfigDropshot,
    pub log: ConfigLogging,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Config::from_toml(&contents)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(contents)?)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Dynamodb(DynamoConfig),
    Postgres(PostgresConfig),
    Memory(MemoryConfig),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DynamoConfig {
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Falls back to the AWS provider chain when unset.
    pub region: Option<String>,
    /// e.g. a DynamoDB Local instance
    pub endpoint_url: Option<String>,
    #[serde(default = "default_consistent_read")]
    pub consistent_read: bool,
}

fn default_table_name() -> String {
    String::from("VisitorCounterDB")
}

fn default_consistent_read() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    4
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Starting count; no record exists when this is unset.
    pub initial: Option<i64>,
}
