//! Runtime configuration of the inventory.
//!
//! Values come from a [`ConfigBuilder`] or from the process environment
//! through [`InventoryConfig::from_env`].

use std::{path::PathBuf, str::FromStr};

use inventory_migrator::MINIMUM_SCHEMA_VERSION;

use crate::error::{InventoryError, Result};

/// Days a partition is kept after its end before it is dropped.
pub const DEFAULT_PARTITION_TTL_DAYS: u32 = 360;

/// Connections held by the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const PARTITION_TTL: &str = "INVENTORY_PARTITION_TTL";
pub const MIGRATIONS_PATH: &str = "INVENTORY_MIGRATIONS_PATH";
pub const MIN_SCHEMA_VERSION: &str = "INVENTORY_MIN_SCHEMA_VERSION";
pub const MAX_CONNECTIONS: &str = "INVENTORY_MAX_CONNECTIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    pub database_url: String,

    /// Partitions ending more than this many days ago are dropped.
    pub partition_ttl_days: u32,

    /// Directory of `<version>_<name>.up.sql` files replacing the embedded
    /// migration ladder.
    pub migrations_path: Option<PathBuf>,

    /// Startup brings the schema up to this version when it is below it.
    pub min_schema_version: u32,

    pub max_connections: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            partition_ttl_days: DEFAULT_PARTITION_TTL_DAYS,
            migrations_path: None,
            min_schema_version: MINIMUM_SCHEMA_VERSION,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl InventoryConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every option through `lookup`, keeping the default of the
    /// missing ones.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = ConfigBuilder::new();

        if let Some(url) = lookup(DATABASE_URL) {
            builder = builder.database_url(url);
        }

        if let Some(ttl) = lookup(PARTITION_TTL) {
            builder = builder.partition_ttl_days(parse(PARTITION_TTL, &ttl)?);
        }

        if let Some(path) = lookup(MIGRATIONS_PATH).filter(|p| !p.trim().is_empty()) {
            builder = builder.migrations_path(path);
        }

        if let Some(version) = lookup(MIN_SCHEMA_VERSION) {
            builder = builder.min_schema_version(parse(MIN_SCHEMA_VERSION, &version)?);
        }

        if let Some(max) = lookup(MAX_CONNECTIONS) {
            builder = builder.max_connections(parse(MAX_CONNECTIONS, &max)?);
        }

        builder.build()
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| InventoryError::invalid_input(key, format!("`{value}`: {e}")))
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: InventoryConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn partition_ttl_days(mut self, days: u32) -> Self {
        self.config.partition_ttl_days = days;
        self
    }

    pub fn migrations_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.migrations_path = Some(path.into());
        self
    }

    pub fn min_schema_version(mut self, version: u32) -> Self {
        self.config.min_schema_version = version;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn build(self) -> Result<InventoryConfig> {
        if self.config.max_connections == 0 {
            return Err(InventoryError::invalid_input(
                MAX_CONNECTIONS,
                "must be at least 1",
            ));
        }

        Ok(self.config)
    }
}
