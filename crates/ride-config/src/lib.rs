//! Configuration loading for the ride gateway.
//!
//! Files are read as TOML, JSON or YAML depending on their extension.
//! `${VAR}` references are substituted from the environment before parsing,
//! then a handful of prefixed environment variables override the result.

use regex::Regex;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				path.display()
			))),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "RIDE_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<GatewayConfig, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		let mut config = self.load_from_file(file_path).await?;
		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		info!(
			path = %file_path,
			services = config.services.len(),
			cache_backend = %config.cache.backend,
			"Configuration loaded"
		);
		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<GatewayConfig, ConfigError> {
		let path = Path::new(file_path);
		if !path.exists() {
			return Err(ConfigError::FileNotFound(file_path.to_string()));
		}

		let format = ConfigFormat::from_path(path)?;
		let content = tokio::fs::read_to_string(path).await?;
		let substituted = substitute_env_vars(&content)?;
		parse_config(&substituted, format)
	}

	fn apply_env_overrides(&self, config: &mut GatewayConfig) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.server.log_level = log_level;
		}

		if let Ok(port) = env::var(format!("{}PORT", self.env_prefix)) {
			config.server.port = port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid port: {}", e)))?;
		}

		if let Ok(url) = env::var(format!("{}REDIS_URL", self.env_prefix)) {
			debug!("Overriding redis url from environment");
			config.cache.backend = "redis".to_string();
			if !config.cache.config.is_table() {
				config.cache.config = toml::Value::Table(toml::map::Map::new());
			}
			if let Some(table) = config.cache.config.as_table_mut() {
				table.insert("url".to_string(), toml::Value::String(url));
			}
		}

		Ok(())
	}
}

/// Parses configuration text in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<GatewayConfig, ConfigError> {
	match format {
		ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string())),
		ConfigFormat::Json => {
			serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Yaml => {
			serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
	}
}

/// Replaces every `${VAR_NAME}` with the value of that environment variable.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

/// Checks cross-field constraints serde cannot express.
pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
	let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

	if config.server.port == 0 {
		return invalid("Server port must be non-zero".to_string());
	}

	match config.cache.backend.as_str() {
		"memory" => {}
		"redis" => {
			if config.cache.config.get("url").and_then(|v| v.as_str()).is_none() {
				return invalid("Redis cache backend requires cache.config.url".to_string());
			}
		}
		other => return invalid(format!("Unknown cache backend '{}'", other)),
	}

	if config.cache.absolute_expiration_secs == 0 {
		return invalid("cache.absolute_expiration_secs must be positive".to_string());
	}

	let registration = config.registration.as_ref().map(|r| ("registration", &r.endpoint));
	for (name, client) in [
		("ride_api", &config.ride_api),
		("token_service", &config.token_service),
	]
	.into_iter()
	.chain(registration)
	{
		if !client.base_url.starts_with("http://") && !client.base_url.starts_with("https://") {
			return invalid(format!("{}.base_url must be an http(s) url", name));
		}
		if client.timeout_ms == 0 {
			return invalid(format!("{}.timeout_ms must be positive", name));
		}
	}

	if config.services.is_empty() {
		return invalid("At least one service must be registered".to_string());
	}

	let mut seen = HashSet::new();
	for service in &config.services {
		let id = service.id.trim().to_ascii_lowercase();
		if id.is_empty() {
			return invalid(format!("Service '{}' has an empty id", service.name));
		}
		if !seen.insert(id) {
			return invalid(format!("Service id '{}' registered twice", service.id));
		}
	}

	if config.retry.initial_interval_ms > config.retry.max_interval_ms {
		return invalid("retry.initial_interval_ms exceeds retry.max_interval_ms".to_string());
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ride_types::ServiceFeature;
	use std::io::Write;
	use std::time::Duration;

	const MINIMAL: &str = r#"
[ride_api]
base_url = "https://api.example.com/v1.2"

[token_service]
base_url = "http://users.internal"

[[services]]
id = "26546650-e557-4a7b-86e7-6a3942445247"
name = "UberPOOL"
features = ["shared"]
"#;

	fn write_config(extension: &str, content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::Builder::new()
			.suffix(&format!(".{}", extension))
			.tempfile()
			.unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_defaults_fill_optional_sections() {
		let config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		assert_eq!(config.server.port, 8080);
		assert_eq!(config.cache.backend, "memory");
		assert_eq!(config.cache.absolute_expiration_secs, 86_400);
		assert_eq!(config.cache.sliding_expiration_secs, 18_000);
		assert!(!config.cache.evict_on_cancel);
		assert_eq!(config.ride_api.timeout_ms, 10_000);
		assert_eq!(config.services[0].features, vec![ServiceFeature::Shared]);
		assert!(validate_config(&config).is_ok());
	}

	#[tokio::test]
	async fn test_load_toml_file() {
		let file = write_config("toml", MINIMAL);
		let config = ConfigLoader::new()
			.with_env_prefix("RIDE_TEST_TOML_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.services.len(), 1);
	}

	#[tokio::test]
	async fn test_load_json_file() {
		let json = r#"{
			"ride_api": { "base_url": "https://api.example.com" },
			"token_service": { "base_url": "https://users.example.com", "timeout_ms": 500 },
			"cache": { "backend": "redis", "config": { "url": "redis://localhost:6379" } },
			"services": [ { "id": "a", "name": "A" } ]
		}"#;
		let file = write_config("json", json);
		let config = ConfigLoader::new()
			.with_env_prefix("RIDE_TEST_JSON_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.token_service.timeout_ms, 500);
		assert_eq!(config.cache.backend, "redis");
	}

	#[tokio::test]
	async fn test_unsupported_extension_is_rejected() {
		let file = write_config("ini", MINIMAL);
		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::ParseError(_))));
	}

	#[tokio::test]
	async fn test_missing_file() {
		let result = ConfigLoader::new()
			.with_file("/definitely/not/here.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}

	#[test]
	fn test_env_substitution() {
		env::set_var("RIDE_CONFIG_TEST_CLIENT", "client-123");
		let out = substitute_env_vars("client_id = \"${RIDE_CONFIG_TEST_CLIENT}\"").unwrap();
		assert_eq!(out, "client_id = \"client-123\"");

		let missing = substitute_env_vars("x = \"${RIDE_CONFIG_TEST_UNSET_VAR}\"");
		assert!(matches!(missing, Err(ConfigError::EnvVarNotFound(_))));
	}

	#[tokio::test]
	async fn test_env_overrides() {
		env::set_var("RIDE_TEST_OVR_PORT", "9191");
		env::set_var("RIDE_TEST_OVR_REDIS_URL", "redis://cache:6379");
		let file = write_config("toml", MINIMAL);
		let config = ConfigLoader::new()
			.with_env_prefix("RIDE_TEST_OVR_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();

		assert_eq!(config.server.port, 9191);
		assert_eq!(config.cache.backend, "redis");
		assert_eq!(
			config.cache.config.get("url").and_then(|v| v.as_str()),
			Some("redis://cache:6379")
		);
	}

	#[test]
	fn test_zero_sliding_expiration_disables_window() {
		let mut config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		assert_eq!(config.cache.sliding_expiration(), Some(Duration::from_secs(18_000)));

		config.cache.sliding_expiration_secs = 0;
		assert!(validate_config(&config).is_ok());
		assert_eq!(config.cache.sliding_expiration(), None);
		assert_eq!(config.cache.absolute_expiration(), Duration::from_secs(86_400));
	}

	#[test]
	fn test_registration_section_is_optional() {
		let config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		assert!(config.registration.is_none());

		let with_registration = format!(
			"{}\n[registration]\nbase_url = \"http://platform.internal\"\n",
			MINIMAL
		);
		let config = parse_config(&with_registration, ConfigFormat::Toml).unwrap();
		let registration = config.registration.as_ref().unwrap();
		assert_eq!(registration.client_name, "Uber");
		assert_eq!(registration.endpoint.timeout_ms, 10_000);
		assert!(validate_config(&config).is_ok());

		let mut config = config;
		if let Some(registration) = config.registration.as_mut() {
			registration.endpoint.base_url = "platform.internal".to_string();
		}
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_validation_failures() {
		let mut config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		config.services.push(config.services[0].clone());
		assert!(validate_config(&config).is_err());

		let mut config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		config.cache.backend = "redis".to_string();
		assert!(validate_config(&config).is_err());

		let mut config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		config.ride_api.base_url = "ftp://nope".to_string();
		assert!(validate_config(&config).is_err());

		let mut config = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
		config.services.clear();
		assert!(validate_config(&config).is_err());
	}
}
