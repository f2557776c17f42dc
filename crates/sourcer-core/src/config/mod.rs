//! Environment-backed configuration.
//!
//! Every knob is enumerated here; an unrecognized value for an enumerated
//! option is a startup error, never a silent default.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_WEIGHTS_VERSION, DimConfig};

/// Which embedding provider drives text→vector conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hosted managed provider (production default).
    Primary,
    /// Alternative hosted provider, also the fallback target.
    Secondary,
    /// Deterministic in-process provider. Dev/test only.
    Local,
}

impl ProviderKind {
    /// Stable lowercase label used in logs and stored records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Primary => "primary",
            ProviderKind::Secondary => "secondary",
            ProviderKind::Local => "local",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(ProviderKind::Primary),
            "secondary" => Ok(ProviderKind::Secondary),
            "local" => Ok(ProviderKind::Local),
            _ => Err(()),
        }
    }
}

/// Deployment environment. Gates dev-only behavior such as the local
/// embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

/// Per-provider circuit breaker knobs.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Stage budgets for a single search request. Each outbound call is bounded
/// by its stage budget; the request-level deadline is the sum plus slack.
#[derive(Debug, Clone, Copy)]
pub struct StageBudgets {
    pub embed: Duration,
    pub recall: Duration,
    pub scoring: Duration,
    pub rerank: Duration,
    pub ml: Duration,
}

impl Default for StageBudgets {
    fn default() -> Self {
        Self {
            embed: Duration::from_millis(150),
            recall: Duration::from_millis(300),
            scoring: Duration::from_millis(200),
            rerank: Duration::from_millis(350),
            ml: Duration::from_millis(100),
        }
    }
}

/// Cache TTLs, one per namespace.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub embed: Duration,
    pub hybrid: Duration,
    pub rerank: Duration,
    pub evidence: Duration,
    pub msgs: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            embed: Duration::from_secs(6 * 3600),
            hybrid: Duration::from_secs(300),
            rerank: Duration::from_secs(3600),
            evidence: Duration::from_secs(24 * 3600),
            msgs: Duration::from_secs(600),
        }
    }
}

/// Header names injected by the gateway. Configurable because different
/// ingress stacks use different conventions.
#[derive(Debug, Clone)]
pub struct HeaderNames {
    pub tenant: String,
    pub request_id: String,
    pub trace_id: String,
    pub user_id: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            tenant: "x-tenant-id".to_string(),
            request_id: "x-request-id".to_string(),
            trace_id: "x-trace-id".to_string(),
            user_id: "x-user-id".to_string(),
        }
    }
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub environment: Environment,

    /// Postgres connection string for the vector store.
    pub database_url: String,
    /// Maximum pool size for the vector store. Minimum is always 0.
    pub database_pool_max: u32,
    /// Run idempotent schema migration before verification.
    pub enable_auto_migrate: bool,

    /// Redis connection URL; `None` selects the in-process cache backend.
    pub redis_url: Option<String>,
    pub cache_ttls: CacheTtls,
    /// Payloads at or above this many bytes are compressed before caching.
    pub cache_compression_threshold: usize,

    pub embedding_provider: ProviderKind,
    pub embedding_dim: DimConfig,
    pub embedding_primary_url: Option<String>,
    pub embedding_primary_model: String,
    pub embedding_secondary_url: Option<String>,
    pub embedding_secondary_model: String,
    pub embedding_api_key: Option<String>,
    pub embedding_timeout: Duration,
    pub embedding_max_input_chars: usize,
    pub embedding_breaker: BreakerConfig,

    /// Master switch for Stage 3.
    pub enable_rerank: bool,
    pub rerank_sla: Duration,
    pub rerank_timeout: Duration,
    pub rerank_breaker: BreakerConfig,
    pub rerank_primary_model: String,
    pub rerank_secondary_model: Option<String>,

    pub ml_trajectory_enabled: bool,
    pub ml_trajectory_url: Option<String>,
    pub ml_trajectory_timeout: Duration,
    pub ml_breaker: BreakerConfig,
    pub shadow_mode_enabled: bool,

    /// Disables hybrid response cache reads (writes still occur).
    pub search_cache_purge: bool,
    pub weights_version: String,
    pub stage_budgets: StageBudgets,

    pub hybrid_rps: u32,
    pub rerank_rps: u32,
    pub tenant_burst: u32,

    pub headers: HeaderNames,
    /// User id allowed to read across tenants. Feature is off when unset.
    pub cross_tenant_identity: Option<String>,
    /// Comma-separated override of the manager-role keyword list.
    pub role_type_manager_keywords: Option<String>,
}

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/sourcer";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            environment: Environment::Development,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_pool_max: 16,
            enable_auto_migrate: false,
            redis_url: None,
            cache_ttls: CacheTtls::default(),
            cache_compression_threshold: 4096,
            embedding_provider: ProviderKind::Primary,
            embedding_dim: DimConfig::default(),
            embedding_primary_url: None,
            embedding_primary_model: "text-embed-v3".to_string(),
            embedding_secondary_url: None,
            embedding_secondary_model: "text-embed-alt-v1".to_string(),
            embedding_api_key: None,
            embedding_timeout: Duration::from_millis(150),
            embedding_max_input_chars: 16_384,
            embedding_breaker: BreakerConfig::default(),
            enable_rerank: true,
            rerank_sla: Duration::from_millis(500),
            rerank_timeout: Duration::from_millis(350),
            rerank_breaker: BreakerConfig::default(),
            rerank_primary_model: "gpt-4o-mini".to_string(),
            rerank_secondary_model: None,
            ml_trajectory_enabled: false,
            ml_trajectory_url: None,
            ml_trajectory_timeout: Duration::from_millis(100),
            ml_breaker: BreakerConfig::default(),
            shadow_mode_enabled: true,
            search_cache_purge: false,
            weights_version: DEFAULT_WEIGHTS_VERSION.to_string(),
            stage_budgets: StageBudgets::default(),
            hybrid_rps: 20,
            rerank_rps: 10,
            tenant_burst: 40,
            headers: HeaderNames::default(),
            cross_tenant_identity: None,
            role_type_manager_keywords: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "SOURCER_PORT";
    const ENV_BIND_ADDR: &'static str = "SOURCER_BIND_ADDR";
    const ENV_ENVIRONMENT: &'static str = "SOURCER_ENV";
    const ENV_DATABASE_URL: &'static str = "SOURCER_DATABASE_URL";
    const ENV_DATABASE_POOL_MAX: &'static str = "SOURCER_DATABASE_POOL_MAX";
    const ENV_ENABLE_AUTO_MIGRATE: &'static str = "ENABLE_AUTO_MIGRATE";
    const ENV_REDIS_URL: &'static str = "SOURCER_REDIS_URL";
    const ENV_CACHE_COMPRESSION_THRESHOLD: &'static str = "SOURCER_CACHE_COMPRESSION_THRESHOLD";
    const ENV_EMBEDDING_PROVIDER: &'static str = "EMBEDDING_PROVIDER";
    const ENV_EMBEDDING_DIMENSIONS: &'static str = "EMBEDDING_DIMENSIONS";
    const ENV_EMBEDDING_PRIMARY_URL: &'static str = "SOURCER_EMBEDDING_PRIMARY_URL";
    const ENV_EMBEDDING_PRIMARY_MODEL: &'static str = "SOURCER_EMBEDDING_PRIMARY_MODEL";
    const ENV_EMBEDDING_SECONDARY_URL: &'static str = "SOURCER_EMBEDDING_SECONDARY_URL";
    const ENV_EMBEDDING_SECONDARY_MODEL: &'static str = "SOURCER_EMBEDDING_SECONDARY_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "SOURCER_EMBEDDING_API_KEY";
    const ENV_EMBEDDING_TIMEOUT_MS: &'static str = "SOURCER_EMBEDDING_TIMEOUT_MS";
    const ENV_EMBEDDING_CIRCUIT_FAILURES: &'static str = "SOURCER_EMBEDDING_CIRCUIT_FAILURES";
    const ENV_EMBEDDING_CIRCUIT_COOLDOWN_MS: &'static str = "SOURCER_EMBEDDING_CIRCUIT_COOLDOWN_MS";
    const ENV_ENABLE_RERANK: &'static str = "ENABLE_RERANK";
    const ENV_RERANK_SLA_MS: &'static str = "RERANK_SLA_MS";
    const ENV_RERANK_TIMEOUT_MS: &'static str = "RERANK_TIMEOUT_MS";
    const ENV_RERANK_CIRCUIT_FAILURES: &'static str = "RERANK_CIRCUIT_FAILURES";
    const ENV_RERANK_CIRCUIT_COOLDOWN_MS: &'static str = "RERANK_CIRCUIT_COOLDOWN_MS";
    const ENV_RERANK_PRIMARY_MODEL: &'static str = "SOURCER_RERANK_PRIMARY_MODEL";
    const ENV_RERANK_SECONDARY_MODEL: &'static str = "SOURCER_RERANK_SECONDARY_MODEL";
    const ENV_ML_TRAJECTORY_ENABLED: &'static str = "ML_TRAJECTORY_ENABLED";
    const ENV_ML_TRAJECTORY_URL: &'static str = "ML_TRAJECTORY_URL";
    const ENV_ML_TRAJECTORY_TIMEOUT_MS: &'static str = "ML_TRAJECTORY_TIMEOUT_MS";
    const ENV_SHADOW_MODE_ENABLED: &'static str = "SHADOW_MODE_ENABLED";
    const ENV_SEARCH_CACHE_PURGE: &'static str = "SEARCH_CACHE_PURGE";
    const ENV_WEIGHTS_VERSION: &'static str = "WEIGHTS_VERSION";
    const ENV_HYBRID_RPS: &'static str = "HYBRID_RPS";
    const ENV_RERANK_RPS: &'static str = "RERANK_RPS";
    const ENV_TENANT_BURST: &'static str = "TENANT_BURST";
    const ENV_HEADER_TENANT: &'static str = "SOURCER_HEADER_TENANT";
    const ENV_HEADER_REQUEST_ID: &'static str = "SOURCER_HEADER_REQUEST_ID";
    const ENV_HEADER_TRACE_ID: &'static str = "SOURCER_HEADER_TRACE_ID";
    const ENV_HEADER_USER_ID: &'static str = "SOURCER_HEADER_USER_ID";
    const ENV_CROSS_TENANT_IDENTITY: &'static str = "CROSS_TENANT_IDENTITY";
    const ENV_ROLE_TYPE_MANAGER_KEYWORDS: &'static str = "ROLE_TYPE_MANAGER_KEYWORDS";

    /// Reads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let embedding_breaker = BreakerConfig {
            failure_threshold: Self::parse_u32_from_env(
                Self::ENV_EMBEDDING_CIRCUIT_FAILURES,
                defaults.embedding_breaker.failure_threshold,
            )?,
            cooldown: Self::parse_ms_from_env(
                Self::ENV_EMBEDDING_CIRCUIT_COOLDOWN_MS,
                defaults.embedding_breaker.cooldown,
            )?,
        };
        let rerank_breaker = BreakerConfig {
            failure_threshold: Self::parse_u32_from_env(
                Self::ENV_RERANK_CIRCUIT_FAILURES,
                defaults.rerank_breaker.failure_threshold,
            )?,
            cooldown: Self::parse_ms_from_env(
                Self::ENV_RERANK_CIRCUIT_COOLDOWN_MS,
                defaults.rerank_breaker.cooldown,
            )?,
        };

        let config = Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            environment: Self::parse_choice_from_env(
                Self::ENV_ENVIRONMENT,
                defaults.environment,
                "dev|production",
            )?,
            database_url: Self::parse_string_from_env(
                Self::ENV_DATABASE_URL,
                defaults.database_url,
            ),
            database_pool_max: Self::parse_u32_from_env(
                Self::ENV_DATABASE_POOL_MAX,
                defaults.database_pool_max,
            )?,
            enable_auto_migrate: Self::parse_bool_from_env(
                Self::ENV_ENABLE_AUTO_MIGRATE,
                defaults.enable_auto_migrate,
            )?,
            redis_url: Self::parse_optional_string_from_env(Self::ENV_REDIS_URL),
            cache_ttls: defaults.cache_ttls,
            cache_compression_threshold: Self::parse_usize_from_env(
                Self::ENV_CACHE_COMPRESSION_THRESHOLD,
                defaults.cache_compression_threshold,
            )?,
            embedding_provider: Self::parse_choice_from_env(
                Self::ENV_EMBEDDING_PROVIDER,
                defaults.embedding_provider,
                "primary|secondary|local",
            )?,
            embedding_dim: DimConfig::new(Self::parse_usize_from_env(
                Self::ENV_EMBEDDING_DIMENSIONS,
                defaults.embedding_dim.embedding_dim,
            )?),
            embedding_primary_url: Self::parse_optional_string_from_env(
                Self::ENV_EMBEDDING_PRIMARY_URL,
            ),
            embedding_primary_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_PRIMARY_MODEL,
                defaults.embedding_primary_model,
            ),
            embedding_secondary_url: Self::parse_optional_string_from_env(
                Self::ENV_EMBEDDING_SECONDARY_URL,
            ),
            embedding_secondary_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_SECONDARY_MODEL,
                defaults.embedding_secondary_model,
            ),
            embedding_api_key: Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY),
            embedding_timeout: Self::parse_ms_from_env(
                Self::ENV_EMBEDDING_TIMEOUT_MS,
                defaults.embedding_timeout,
            )?,
            embedding_max_input_chars: defaults.embedding_max_input_chars,
            embedding_breaker,
            enable_rerank: Self::parse_bool_from_env(
                Self::ENV_ENABLE_RERANK,
                defaults.enable_rerank,
            )?,
            rerank_sla: Self::parse_ms_from_env(Self::ENV_RERANK_SLA_MS, defaults.rerank_sla)?,
            rerank_timeout: Self::parse_ms_from_env(
                Self::ENV_RERANK_TIMEOUT_MS,
                defaults.rerank_timeout,
            )?,
            rerank_breaker,
            rerank_primary_model: Self::parse_string_from_env(
                Self::ENV_RERANK_PRIMARY_MODEL,
                defaults.rerank_primary_model,
            ),
            rerank_secondary_model: Self::parse_optional_string_from_env(
                Self::ENV_RERANK_SECONDARY_MODEL,
            ),
            ml_trajectory_enabled: Self::parse_bool_from_env(
                Self::ENV_ML_TRAJECTORY_ENABLED,
                defaults.ml_trajectory_enabled,
            )?,
            ml_trajectory_url: Self::parse_optional_string_from_env(Self::ENV_ML_TRAJECTORY_URL),
            ml_trajectory_timeout: Self::parse_ms_from_env(
                Self::ENV_ML_TRAJECTORY_TIMEOUT_MS,
                defaults.ml_trajectory_timeout,
            )?,
            ml_breaker: defaults.ml_breaker,
            shadow_mode_enabled: Self::parse_bool_from_env(
                Self::ENV_SHADOW_MODE_ENABLED,
                defaults.shadow_mode_enabled,
            )?,
            search_cache_purge: Self::parse_bool_from_env(
                Self::ENV_SEARCH_CACHE_PURGE,
                defaults.search_cache_purge,
            )?,
            weights_version: Self::parse_string_from_env(
                Self::ENV_WEIGHTS_VERSION,
                defaults.weights_version,
            ),
            stage_budgets: defaults.stage_budgets,
            hybrid_rps: Self::parse_u32_from_env(Self::ENV_HYBRID_RPS, defaults.hybrid_rps)?,
            rerank_rps: Self::parse_u32_from_env(Self::ENV_RERANK_RPS, defaults.rerank_rps)?,
            tenant_burst: Self::parse_u32_from_env(Self::ENV_TENANT_BURST, defaults.tenant_burst)?,
            headers: HeaderNames {
                tenant: Self::parse_string_from_env(
                    Self::ENV_HEADER_TENANT,
                    defaults.headers.tenant,
                ),
                request_id: Self::parse_string_from_env(
                    Self::ENV_HEADER_REQUEST_ID,
                    defaults.headers.request_id,
                ),
                trace_id: Self::parse_string_from_env(
                    Self::ENV_HEADER_TRACE_ID,
                    defaults.headers.trace_id,
                ),
                user_id: Self::parse_string_from_env(
                    Self::ENV_HEADER_USER_ID,
                    defaults.headers.user_id,
                ),
            },
            cross_tenant_identity: Self::parse_optional_string_from_env(
                Self::ENV_CROSS_TENANT_IDENTITY,
            ),
            role_type_manager_keywords: Self::parse_optional_string_from_env(
                Self::ENV_ROLE_TYPE_MANAGER_KEYWORDS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field validation. Called by [`Config::from_env`]; callers
    /// constructing a config by hand should invoke it too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding_dim.validate()?;

        if self.embedding_provider == ProviderKind::Local
            && self.environment == Environment::Production
        {
            return Err(ConfigError::LocalProviderForbidden);
        }

        if self.embedding_provider == ProviderKind::Primary
            && self.environment == Environment::Production
            && self.embedding_primary_url.is_none()
        {
            return Err(ConfigError::MissingRequired {
                var: Self::ENV_EMBEDDING_PRIMARY_URL,
                reason: "EMBEDDING_PROVIDER=primary in production",
            });
        }

        if self.ml_trajectory_enabled && self.ml_trajectory_url.is_none() {
            return Err(ConfigError::MissingRequired {
                var: Self::ENV_ML_TRAJECTORY_URL,
                reason: "ML_TRAJECTORY_ENABLED=true",
            });
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;
                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }
                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_choice_from_env<T: FromStr<Err = ()> + Copy>(
        var: &'static str,
        default: T,
        expected: &'static str,
    ) -> Result<T, ConfigError> {
        match env::var(var) {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidChoice {
                var,
                value,
                expected,
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var: &str, default: String) -> String {
        env::var(var).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var: &str) -> Option<String> {
        env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_bool_from_env(var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(var) {
            Ok(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidBool { var, value }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_u32_from_env(var: &'static str, default: u32) -> Result<u32, ConfigError> {
        match env::var(var) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var, value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_usize_from_env(var: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(var) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var, value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_ms_from_env(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        match env::var(var) {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidNumber { var, value }),
            Err(_) => Ok(default),
        }
    }
}
