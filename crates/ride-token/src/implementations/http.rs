//! HTTP token backend talking to the users service.

use crate::{TokenError, TokenInterface};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
	service_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
	#[serde(default)]
	access_token: String,
}

/// Users-service client: `POST {base}/v1/access-token`.
pub struct HttpTokenClient {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpTokenClient {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TokenError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				TokenError::Configuration(format!("Failed to create HTTP client: {}", e))
			})?;

		Ok(Self {
			client,
			endpoint: format!("{}/v1/access-token", base_url.trim_end_matches('/')),
		})
	}
}

#[async_trait]
impl TokenInterface for HttpTokenClient {
	async fn fetch_access_token(
		&self,
		session_token: &str,
		service_id: &str,
	) -> Result<String, TokenError> {
		let response = self
			.client
			.post(&self.endpoint)
			.bearer_auth(session_token)
			.json(&AccessTokenRequest { service_id })
			.send()
			.await
			.map_err(|e| TokenError::Transport(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			debug!(%status, "Token service refused the exchange");
			return Err(TokenError::Rejected(format!("token service returned {}", status)));
		}

		let body: AccessTokenResponse = response
			.json()
			.await
			.map_err(|e| TokenError::Transport(format!("Invalid token response: {}", e)))?;

		Ok(body.access_token)
	}
}
