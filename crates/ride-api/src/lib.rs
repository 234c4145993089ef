//! Client for the upstream ride-hailing API.
//!
//! The backend trait mirrors the five upstream endpoints one to one. The
//! [`RideApiService`] wrapper adds bounded exponential backoff for transient
//! failures; ride creation is retried only when the request never left the
//! gateway, so a ride is never booked twice.

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use ride_types::{
	CreateRideRequest, EstimateRequest, EstimateResponse, Product, RideRequestDetails,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors returned by the ride API client.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The connection could not be established; the request was not sent.
	#[error("Connection failed: {0}")]
	Connect(String),
	/// The request was sent but no response arrived in time.
	#[error("Request timed out: {0}")]
	Timeout(String),
	/// The upstream does not know the requested resource.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The upstream answered with a non-success status.
	#[error("Upstream returned {status}: {body}")]
	Status { status: u16, body: String },
	/// The exchange failed for another reason after the request was built.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The upstream answered with a body that could not be decoded.
	#[error("Invalid response: {0}")]
	Decode(String),
	/// The client could not be constructed.
	#[error("Invalid configuration: {0}")]
	Configuration(String),
}

impl ApiError {
	/// Whether retrying the same call may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			ApiError::Connect(_) | ApiError::Timeout(_) => true,
			ApiError::Status { status, .. } => *status == 429 || *status >= 500,
			ApiError::NotFound(_)
			| ApiError::Transport(_)
			| ApiError::Decode(_)
			| ApiError::Configuration(_) => false,
		}
	}

	/// Whether the request is known not to have reached the upstream.
	pub fn is_connect(&self) -> bool {
		matches!(self, ApiError::Connect(_))
	}
}

/// Trait defining the interface for ride API backends.
///
/// Every call carries the access token obtained for it immediately before.
#[async_trait]
pub trait RideApiInterface: Send + Sync {
	/// Quotes one product for a trip.
	async fn request_estimate(
		&self,
		access_token: &str,
		request: &EstimateRequest,
	) -> Result<EstimateResponse, ApiError>;

	/// Looks up capacity, display name and pricing of a product.
	async fn get_product(&self, access_token: &str, product_id: &str) -> Result<Product, ApiError>;

	/// Books a ride against a previously quoted fare.
	async fn create_request(
		&self,
		access_token: &str,
		request: &CreateRideRequest,
	) -> Result<RideRequestDetails, ApiError>;

	/// Fetches the live state of a booked ride.
	async fn get_request(
		&self,
		access_token: &str,
		request_id: &str,
	) -> Result<RideRequestDetails, ApiError>;

	/// Cancels a booked ride.
	async fn delete_request(&self, access_token: &str, request_id: &str) -> Result<(), ApiError>;
}

/// Retry settings for upstream calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	pub max_retries: u32,
	pub initial_interval: Duration,
	pub max_interval: Duration,
	pub max_elapsed: Duration,
}

impl RetryPolicy {
	fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoff {
			initial_interval: self.initial_interval,
			current_interval: self.initial_interval,
			max_interval: self.max_interval,
			max_elapsed_time: Some(self.max_elapsed),
			..Default::default()
		}
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_interval: Duration::from_millis(200),
			max_interval: Duration::from_secs(2),
			max_elapsed: Duration::from_secs(10),
		}
	}
}

/// Ride API service with retries.
pub struct RideApiService {
	backend: Box<dyn RideApiInterface>,
	retry: RetryPolicy,
}

impl RideApiService {
	pub fn new(backend: Box<dyn RideApiInterface>, retry: RetryPolicy) -> Self {
		Self { backend, retry }
	}

	#[instrument(skip(self, access_token, request), fields(product_id = %request.product_id))]
	pub async fn request_estimate(
		&self,
		access_token: &str,
		request: &EstimateRequest,
	) -> Result<EstimateResponse, ApiError> {
		self.with_retry("estimate", ApiError::is_transient, || {
			self.backend.request_estimate(access_token, request)
		})
		.await
	}

	#[instrument(skip(self, access_token))]
	pub async fn get_product(&self, access_token: &str, product_id: &str) -> Result<Product, ApiError> {
		self.with_retry("product", ApiError::is_transient, || {
			self.backend.get_product(access_token, product_id)
		})
		.await
	}

	#[instrument(skip(self, access_token, request), fields(product_id = %request.product_id))]
	pub async fn create_request(
		&self,
		access_token: &str,
		request: &CreateRideRequest,
	) -> Result<RideRequestDetails, ApiError> {
		self.with_retry("create ride", ApiError::is_connect, || {
			self.backend.create_request(access_token, request)
		})
		.await
	}

	#[instrument(skip(self, access_token))]
	pub async fn get_request(
		&self,
		access_token: &str,
		request_id: &str,
	) -> Result<RideRequestDetails, ApiError> {
		self.with_retry("get ride", ApiError::is_transient, || {
			self.backend.get_request(access_token, request_id)
		})
		.await
	}

	#[instrument(skip(self, access_token))]
	pub async fn delete_request(&self, access_token: &str, request_id: &str) -> Result<(), ApiError> {
		self.with_retry("cancel ride", ApiError::is_connect, || {
			self.backend.delete_request(access_token, request_id)
		})
		.await
	}

	async fn with_retry<T, F, Fut>(
		&self,
		operation: &str,
		retryable: fn(&ApiError) -> bool,
		mut call: F,
	) -> Result<T, ApiError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, ApiError>>,
	{
		let mut backoff = self.retry.backoff();
		let mut attempts = 0;

		loop {
			match call().await {
				Ok(result) => return Ok(result),
				Err(e) if !retryable(&e) => return Err(e),
				Err(e) => {
					attempts += 1;

					if attempts > self.retry.max_retries {
						warn!(
							"Upstream {} failed after {} attempts, giving up: {}",
							operation, attempts, e
						);
						return Err(e);
					}

					if let Some(delay) = backoff.next_backoff() {
						warn!(
							"Upstream {} failed, attempt {}/{}, retrying in {:?}: {}",
							operation, attempts, self.retry.max_retries, delay, e
						);
						tokio::time::sleep(delay).await;
					} else {
						warn!(
							"Upstream {} failed, backoff exhausted after {} attempts: {}",
							operation, attempts, e
						);
						return Err(e);
					}
				}
			}
		}
	}
}
