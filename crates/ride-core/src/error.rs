use ride_api::ApiError;
use ride_storage::StorageError;
use ride_token::TokenError;
use thiserror::Error;

/// Failure of one gateway operation.
#[derive(Debug, Error)]
pub enum RideError {
	#[error("Invalid request: {0}")]
	Validation(String),

	#[error("Unauthorized: {0}")]
	Auth(String),

	#[error("Not found: {0}")]
	NotFound(String),

	/// The upstream no longer knows a resource the cached record points to.
	#[error("Upstream resource not found: {0}")]
	UpstreamNotFound(String),

	#[error("Invalid state: {0}")]
	InvalidState(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Upstream error: {0}")]
	Upstream(String),

	#[error("Storage error: {0}")]
	Storage(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl From<TokenError> for RideError {
	fn from(e: TokenError) -> Self {
		RideError::Auth(e.to_string())
	}
}

impl From<ApiError> for RideError {
	fn from(e: ApiError) -> Self {
		match e {
			ApiError::NotFound(resource) => RideError::UpstreamNotFound(resource),
			other => RideError::Upstream(other.to_string()),
		}
	}
}

impl From<StorageError> for RideError {
	fn from(e: StorageError) -> Self {
		match e {
			StorageError::NotFound => RideError::NotFound("estimate".to_string()),
			other => RideError::Storage(other.to_string()),
		}
	}
}

impl From<validator::ValidationErrors> for RideError {
	fn from(e: validator::ValidationErrors) -> Self {
		RideError::Validation(e.to_string())
	}
}
