//! Orchestration core of the ride gateway.
//!
//! The engine ties the estimate cache, the access token mediator and the ride
//! API client together behind the five gateway operations. Backends are
//! supplied as factories so the binary and the tests can wire different
//! implementations into the same engine.

use futures::stream::BoxStream;
use ride_api::{ApiError, RetryPolicy, RideApiInterface, RideApiService};
use ride_config::{GatewayConfig, HttpClientConfig};
use ride_storage::{CacheEntryOptions, StorageError, StorageInterface, StorageService};
use ride_token::{TokenError, TokenInterface, TokenService};
use ride_types::{
	CancellationFee, EstimateModel, GetEstimatesRequest, RideStatus, ServiceRegistry,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod error;
pub mod estimates;
pub mod identifier;
pub mod records;
pub mod requests;

#[cfg(test)]
mod testing;

pub use error::RideError;
use estimates::{EstimateOrchestrator, EstimateSettings};
use records::EstimateStore;
use requests::RequestOrchestrator;

pub struct RideEngine {
	config: GatewayConfig,
	registry: Arc<ServiceRegistry>,
	store: Arc<EstimateStore>,
	estimates: EstimateOrchestrator,
	requests: RequestOrchestrator,
}

impl RideEngine {
	/// Starts a GetEstimates call. See [`EstimateOrchestrator::get_estimates`].
	pub fn get_estimates(
		&self,
		session_token: String,
		request: GetEstimatesRequest,
	) -> Result<BoxStream<'static, EstimateModel>, RideError> {
		self.estimates.get_estimates(session_token, request)
	}

	pub async fn refresh_estimate(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<EstimateModel, RideError> {
		self.estimates
			.refresh_estimate(session_token, estimate_id)
			.await
	}

	pub async fn post_ride_request(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<RideStatus, RideError> {
		self.requests
			.post_ride_request(session_token, estimate_id)
			.await
	}

	pub async fn get_ride_request(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<RideStatus, RideError> {
		self.requests
			.get_ride_request(session_token, estimate_id)
			.await
	}

	pub async fn delete_ride_request(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<CancellationFee, RideError> {
		self.requests
			.delete_ride_request(session_token, estimate_id)
			.await
	}

	pub fn registry(&self) -> &ServiceRegistry {
		&self.registry
	}

	pub fn store(&self) -> &EstimateStore {
		&self.store
	}

	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}
}

// Type aliases for factory functions
type StorageFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send>;
type TokenFactory =
	Box<dyn Fn(&HttpClientConfig) -> Result<Box<dyn TokenInterface>, TokenError> + Send>;
type RideApiFactory =
	Box<dyn Fn(&HttpClientConfig) -> Result<Box<dyn RideApiInterface>, ApiError> + Send>;

// Factory pattern for creating services from config
pub struct RideBuilder {
	config: GatewayConfig,
	storage_factories: HashMap<String, StorageFactory>,
	token_factory: Option<TokenFactory>,
	ride_api_factory: Option<RideApiFactory>,
}

impl RideBuilder {
	pub fn new(config: GatewayConfig) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			token_factory: None,
			ride_api_factory: None,
		}
	}

	/// Registers a cache backend under the name used in `cache.backend`.
	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_token_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&HttpClientConfig) -> Result<Box<dyn TokenInterface>, TokenError> + Send + 'static,
	{
		self.token_factory = Some(Box::new(factory));
		self
	}

	pub fn with_ride_api_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&HttpClientConfig) -> Result<Box<dyn RideApiInterface>, ApiError> + Send + 'static,
	{
		self.ride_api_factory = Some(Box::new(factory));
		self
	}

	pub fn build(self) -> Result<RideEngine, RideError> {
		let config = self.config;

		// Create cache backend
		let storage_factory = self
			.storage_factories
			.get(&config.cache.backend)
			.ok_or_else(|| {
				RideError::Config(format!(
					"No storage factory for backend '{}'",
					config.cache.backend
				))
			})?;
		let backend = storage_factory(&config.cache.config)
			.map_err(|e| RideError::Config(format!("Cache backend: {}", e)))?;
		let mut entry_options =
			CacheEntryOptions::new().with_absolute_expiration(config.cache.absolute_expiration());
		if let Some(window) = config.cache.sliding_expiration() {
			entry_options = entry_options.with_sliding_expiration(window);
		}
		let storage = StorageService::new(backend).with_default_options(entry_options);
		let store = Arc::new(EstimateStore::new(storage));

		// Create token mediator
		let token_backend = self
			.token_factory
			.ok_or_else(|| RideError::Config("Token factory not provided".into()))?(
			&config.token_service,
		)
		.map_err(|e| RideError::Config(format!("Token service: {}", e)))?;
		let tokens = Arc::new(TokenService::new(token_backend));

		// Create ride API client
		let api_backend = self
			.ride_api_factory
			.ok_or_else(|| RideError::Config("Ride API factory not provided".into()))?(
			&config.ride_api,
		)
		.map_err(|e| RideError::Config(format!("Ride API: {}", e)))?;
		let retry = RetryPolicy {
			max_retries: config.retry.max_retries,
			initial_interval: Duration::from_millis(config.retry.initial_interval_ms),
			max_interval: Duration::from_millis(config.retry.max_interval_ms),
			max_elapsed: Duration::from_millis(config.retry.max_elapsed_ms),
		};
		let api = Arc::new(RideApiService::new(api_backend, retry));

		let registry = Arc::new(ServiceRegistry::new(config.services.iter().cloned()));
		if registry.is_empty() {
			return Err(RideError::Config("No services registered".into()));
		}

		let estimates = EstimateOrchestrator::new(
			store.clone(),
			tokens.clone(),
			api.clone(),
			registry.clone(),
			EstimateSettings {
				pacing: config.estimates.pacing(),
				client_id: config.estimates.client_id.clone(),
				deep_link_base: config.estimates.deep_link_base.clone(),
			},
		);
		let requests =
			RequestOrchestrator::new(store.clone(), tokens, api, config.cache.evict_on_cancel);

		info!(
			services = registry.len(),
			cache_backend = %config.cache.backend,
			"Ride engine built"
		);

		Ok(RideEngine {
			config,
			registry,
			store,
			estimates,
			requests,
		})
	}
}
