//! Production backends wired into the engine builder.

use ride_api::implementations::http::HttpRideApi;
use ride_api::{ApiError, RideApiInterface};
use ride_config::{GatewayConfig, HttpClientConfig};
use ride_core::RideBuilder;
use ride_registry::implementations::http::HttpRegistryClient;
use ride_registry::{RegistrationReport, RegistryService};
use ride_storage::implementations::{memory, redis};
use ride_token::implementations::http::HttpTokenClient;
use ride_token::{TokenError, TokenInterface};
use tracing::{error, info};

/// Returns a builder with every backend the gateway ships with registered.
pub fn engine_builder(config: GatewayConfig) -> RideBuilder {
	RideBuilder::new(config)
		.with_storage_factory("memory", memory::create_storage)
		.with_storage_factory("redis", redis::create_storage)
		.with_token_factory(create_token_backend)
		.with_ride_api_factory(create_ride_api_backend)
}

fn create_token_backend(config: &HttpClientConfig) -> Result<Box<dyn TokenInterface>, TokenError> {
	Ok(Box::new(HttpTokenClient::new(
		&config.base_url,
		config.timeout(),
	)?))
}

fn create_ride_api_backend(
	config: &HttpClientConfig,
) -> Result<Box<dyn RideApiInterface>, ApiError> {
	Ok(Box::new(HttpRideApi::new(&config.base_url, config.timeout())?))
}

/// Announces the configured services to the platform.
///
/// Returns `None` when no `registration` section is configured or the client
/// cannot be built; failures are logged, never propagated.
pub async fn register_services(config: &GatewayConfig) -> Option<RegistrationReport> {
	let Some(registration) = &config.registration else {
		info!("No registration endpoint configured, skipping service registration");
		return None;
	};

	let client = match HttpRegistryClient::new(
		&registration.endpoint.base_url,
		registration.endpoint.timeout(),
	) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create registry client: {}", e);
			return None;
		}
	};

	let registry = RegistryService::new(Box::new(client), registration.client_name.clone());
	Some(registry.register_all(&config.services).await)
}
