//! Configuration and dependency initialization.

mod dependencies;

pub use dependencies::Dependencies;

use std::env;
use std::str::FromStr;
use centric_etl_repository::dataconnect::DEFAULT_TABLE_PREFIX;
use centric_etl_repository::SearchClusterConfig;
use tracing::warn;

use crate::errors::ServiceError;
use crate::schedule::{CronSchedule, DEFAULT_SCHEDULE, DEFAULT_TIMEZONE};

/// Default search cluster URL.
const DEFAULT_ES_HOST: &str = "http://localhost:9200";

/// Default staging pool size.
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 100;

/// Default control surface port.
const DEFAULT_SERVER_PORT: u16 = 8081;

/// Settings of the ETL, read once at startup.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Base URL of the Data Connect API.
    pub data_table_host: String,
    /// Table namespace in the Data Connect API.
    pub data_table_prefix: String,
    /// PostgreSQL connection string of the staging store.
    pub database_url: String,
    pub database_max_connections: u32,
    pub search: SearchClusterConfig,
    pub rollcall_host: String,
    /// Read alias repointed by every load.
    pub rollcall_alias: String,
    pub rollcall_entity: String,
    /// Abort the load when the index mapping cannot be applied.
    pub strict_index_mapping: bool,
    /// When the recurring all-stages run fires.
    pub schedule: CronSchedule,
    /// Whether the recurring run starts active.
    pub schedule_enabled: bool,
    pub server_port: u16,
}

impl EtlConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `DNASTACK_DATA_TABLE_HOST`: Data Connect API base URL (required)
    /// - `DATA_TABLE_PREFIX`: table namespace (default: viralai2.oicr_covidcloud)
    /// - `DATABASE_URL`: staging store connection string (required)
    /// - `DATABASE_MAX_CONNECTIONS`: staging pool size (default: 100)
    /// - `ES_HOST`, `ES_USER`, `ES_PASS`: search cluster (default: http://localhost:9200, no auth)
    /// - `ROLLCALL_HOST`, `ROLLCALL_ALIAS`, `ROLLCALL_ENTITY`: index registry (required)
    /// - `STRICT_INDEX_MAPPING`: fail the load on mapping errors (default: false)
    /// - `ALL_STAGES_SCHEDULE`: cron expression of the recurring run (default: 0 0 * * *)
    /// - `SCHEDULE_TIMEZONE`: timezone the expression is evaluated in (default: America/Toronto)
    /// - `SCHEDULE_ENABLED`: start the recurring run active (default: true)
    /// - `SERVER_PORT`: control surface port (default: 8081)
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ServiceError::config(format!("{} must be set", key)))
        };

        let mut search = SearchClusterConfig::new(
            lookup("ES_HOST").unwrap_or_else(|| DEFAULT_ES_HOST.to_string()),
        );
        if let (Some(user), Some(password)) = (lookup("ES_USER"), lookup("ES_PASS")) {
            search = search.with_credentials(user, password);
        }

        Ok(Self {
            data_table_host: required("DNASTACK_DATA_TABLE_HOST")?,
            data_table_prefix: lookup("DATA_TABLE_PREFIX")
                .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string()),
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            ),
            search,
            rollcall_host: required("ROLLCALL_HOST")?,
            rollcall_alias: required("ROLLCALL_ALIAS")?,
            rollcall_entity: required("ROLLCALL_ENTITY")?,
            strict_index_mapping: flag_or(&lookup, "STRICT_INDEX_MAPPING", false),
            schedule: CronSchedule::parse(
                &lookup("ALL_STAGES_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
                &lookup("SCHEDULE_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            )?,
            schedule_enabled: flag_or(&lookup, "SCHEDULE_ENABLED", true),
            server_port: parse_or(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
    }
}

fn flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_lowercase()) {
        None => default,
        Some(raw) => match raw.as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warn!(variable = key, value = %raw, default, "Invalid flag, using default");
                default
            }
        },
    }
}
