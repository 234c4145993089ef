//! Access token mediation for the ride gateway.
//!
//! Every authorized upstream call needs a service-scoped access token. This
//! crate exchanges the caller's session token for one, freshly on each call.
//! Tokens are never cached.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum TokenError {
	/// The token service answered but did not hand out a usable token.
	#[error("Access token rejected: {0}")]
	Rejected(String),
	/// The token service could not be reached or answered garbage.
	#[error("Token service unavailable: {0}")]
	Transport(String),
	/// The backend could not be constructed.
	#[error("Invalid token service configuration: {0}")]
	Configuration(String),
}

/// Trait defining the interface for token-exchange backends.
#[async_trait]
pub trait TokenInterface: Send + Sync {
	/// Exchanges a session token for an access token scoped to `service_id`.
	///
	/// Implementations may return an empty string when the service declines;
	/// [`TokenService`] treats that as a rejection.
	async fn fetch_access_token(
		&self,
		session_token: &str,
		service_id: &str,
	) -> Result<String, TokenError>;
}

/// Mediator handing out access tokens to the orchestrators.
///
/// Every failure, including an empty token, is reported as an error so
/// callers follow one policy.
pub struct TokenService {
	backend: Box<dyn TokenInterface>,
}

impl TokenService {
	pub fn new(backend: Box<dyn TokenInterface>) -> Self {
		Self { backend }
	}

	/// Returns a non-empty bearer token for one upstream call.
	#[instrument(skip(self, session_token))]
	pub async fn get_access_token(
		&self,
		session_token: &str,
		service_id: &str,
	) -> Result<String, TokenError> {
		if session_token.trim().is_empty() {
			return Err(TokenError::Rejected("missing session token".to_string()));
		}

		let token = self
			.backend
			.fetch_access_token(session_token, service_id)
			.await
			.inspect_err(|e| warn!(error = %e, "Access token exchange failed"))?;

		if token.trim().is_empty() {
			warn!("Token service returned an empty access token");
			return Err(TokenError::Rejected("empty access token".to_string()));
		}

		debug!("Obtained access token");
		Ok(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	struct FixedToken {
		token: Result<String, ()>,
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl TokenInterface for FixedToken {
		async fn fetch_access_token(&self, _: &str, _: &str) -> Result<String, TokenError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.token
				.clone()
				.map_err(|_| TokenError::Transport("connection refused".to_string()))
		}
	}

	fn service(token: Result<&str, ()>) -> (TokenService, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let backend = FixedToken {
			token: token.map(str::to_string),
			calls: calls.clone(),
		};
		(TokenService::new(Box::new(backend)), calls)
	}

	#[tokio::test]
	async fn test_token_is_fetched_on_every_call() {
		let (tokens, calls) = service(Ok("abc"));
		assert_eq!(tokens.get_access_token("session", "svc").await.unwrap(), "abc");
		assert_eq!(tokens.get_access_token("session", "svc").await.unwrap(), "abc");
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_empty_token_is_rejected() {
		let (tokens, _) = service(Ok("  "));
		let result = tokens.get_access_token("session", "svc").await;
		assert!(matches!(result, Err(TokenError::Rejected(_))));
	}

	#[tokio::test]
	async fn test_transport_failure_is_an_error() {
		let (tokens, _) = service(Err(()));
		let result = tokens.get_access_token("session", "svc").await;
		assert!(matches!(result, Err(TokenError::Transport(_))));
	}

	#[tokio::test]
	async fn test_missing_session_skips_backend() {
		let (tokens, calls) = service(Ok("abc"));
		assert!(tokens.get_access_token("", "svc").await.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}
}
