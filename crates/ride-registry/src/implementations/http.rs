//! HTTP registration backend: `POST {base}/v1/services`.

use crate::{RegistryError, RegistryInterface, ServiceRegistration};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct HttpRegistryClient {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpRegistryClient {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				RegistryError::Configuration(format!("Failed to create HTTP client: {}", e))
			})?;

		Ok(Self {
			client,
			endpoint: format!("{}/v1/services", base_url.trim_end_matches('/')),
		})
	}
}

#[async_trait]
impl RegistryInterface for HttpRegistryClient {
	async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), RegistryError> {
		let response = self
			.client
			.post(&self.endpoint)
			.json(registration)
			.send()
			.await
			.map_err(|e| RegistryError::Transport(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			debug!(%status, "Services endpoint refused registration");
			return Err(RegistryError::Rejected(format!("{}: {}", status, body)));
		}

		Ok(())
	}
}
