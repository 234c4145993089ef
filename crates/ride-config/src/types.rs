//! Configuration types for the gateway.

use ride_types::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// HTTP listener settings
	#[serde(default)]
	pub server: ServerConfig,
	/// Estimate cache settings
	#[serde(default)]
	pub cache: CacheConfig,
	/// Upstream ride-hailing API
	pub ride_api: HttpClientConfig,
	/// Users service that exchanges session tokens for access tokens
	pub token_service: HttpClientConfig,
	/// Platform services endpoint announced to on startup; skipped when absent
	#[serde(default)]
	pub registration: Option<RegistrationConfig>,
	/// Estimate streaming behaviour
	#[serde(default)]
	pub estimates: EstimatesConfig,
	/// Retry policy for upstream calls
	#[serde(default)]
	pub retry: RetryConfig,
	/// Registered ride services
	#[serde(default)]
	pub services: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
			log_level: default_log_level(),
		}
	}
}

/// Estimate cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
	/// Storage backend: "memory" or "redis"
	#[serde(default = "default_cache_backend")]
	pub backend: String,
	/// Lifetime of a record from its last write
	#[serde(default = "default_absolute_expiration_secs")]
	pub absolute_expiration_secs: u64,
	/// Idle window after which an unread record expires
	#[serde(default = "default_sliding_expiration_secs")]
	pub sliding_expiration_secs: u64,
	/// Remove the record once its ride has been cancelled
	#[serde(default)]
	pub evict_on_cancel: bool,
	/// Backend-specific settings
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

impl CacheConfig {
	pub fn absolute_expiration(&self) -> Duration {
		Duration::from_secs(self.absolute_expiration_secs)
	}

	/// Sliding window, or `None` when `sliding_expiration_secs` is 0.
	pub fn sliding_expiration(&self) -> Option<Duration> {
		(self.sliding_expiration_secs > 0).then(|| Duration::from_secs(self.sliding_expiration_secs))
	}
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			backend: default_cache_backend(),
			absolute_expiration_secs: default_absolute_expiration_secs(),
			sliding_expiration_secs: default_sliding_expiration_secs(),
			evict_on_cancel: false,
			config: empty_table(),
		}
	}
}

/// Settings for an outbound HTTP dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpClientConfig {
	pub base_url: String,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
}

impl HttpClientConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

/// Startup registration of the configured services.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrationConfig {
	#[serde(flatten)]
	pub endpoint: HttpClientConfig,
	/// Provider name announced with every service
	#[serde(default = "default_client_name")]
	pub client_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EstimatesConfig {
	/// Delay between consecutive services of one estimates call
	#[serde(default = "default_pacing_ms")]
	pub pacing_ms: u64,
	/// Client id embedded in booking deep links
	#[serde(default)]
	pub client_id: String,
	/// Base of the booking deep link
	#[serde(default = "default_deep_link_base")]
	pub deep_link_base: String,
}

impl EstimatesConfig {
	pub fn pacing(&self) -> Duration {
		Duration::from_millis(self.pacing_ms)
	}
}

impl Default for EstimatesConfig {
	fn default() -> Self {
		Self {
			pacing_ms: default_pacing_ms(),
			client_id: String::new(),
			deep_link_base: default_deep_link_base(),
		}
	}
}

/// Exponential backoff settings for transient upstream failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_initial_interval_ms")]
	pub initial_interval_ms: u64,
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
	#[serde(default = "default_max_elapsed_ms")]
	pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			initial_interval_ms: default_initial_interval_ms(),
			max_interval_ms: default_max_interval_ms(),
			max_elapsed_ms: default_max_elapsed_ms(),
		}
	}
}

fn default_host() -> String {
	"0.0.0.0".to_string()
}

fn default_port() -> u16 {
	8080
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_cache_backend() -> String {
	"memory".to_string()
}

fn default_absolute_expiration_secs() -> u64 {
	24 * 60 * 60
}

fn default_sliding_expiration_secs() -> u64 {
	5 * 60 * 60
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

fn default_timeout_ms() -> u64 {
	10_000
}

fn default_client_name() -> String {
	"Uber".to_string()
}

fn default_pacing_ms() -> u64 {
	100
}

fn default_deep_link_base() -> String {
	"https://m.uber.com/ul/".to_string()
}

fn default_max_retries() -> u32 {
	3
}

fn default_initial_interval_ms() -> u64 {
	200
}

fn default_max_interval_ms() -> u64 {
	2_000
}

fn default_max_elapsed_ms() -> u64 {
	10_000
}
