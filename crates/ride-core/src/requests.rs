//! Ride creation, polling and cancellation.
//!
//! A ride is addressed by the internal estimate id of the quote it was booked
//! from. The record moves from quoted to requested when the upstream accepts
//! the booking and to cancelled when the gateway cancels it; everything else is
//! read live from the upstream.

use crate::records::EstimateStore;
use crate::RideError;
use ride_api::RideApiService;
use ride_token::TokenService;
use ride_types::{
	CancellationFee, CreateRideRequest, CurrencyAmount, EstimateRecord, RideStage, RideStatus,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct RequestOrchestrator {
	store: Arc<EstimateStore>,
	tokens: Arc<TokenService>,
	api: Arc<RideApiService>,
	evict_on_cancel: bool,
}

impl RequestOrchestrator {
	pub fn new(
		store: Arc<EstimateStore>,
		tokens: Arc<TokenService>,
		api: Arc<RideApiService>,
		evict_on_cancel: bool,
	) -> Self {
		Self {
			store,
			tokens,
			api,
			evict_on_cancel,
		}
	}

	/// Books a ride from a quoted estimate.
	#[instrument(skip(self, session_token))]
	pub async fn post_ride_request(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<RideStatus, RideError> {
		let mut record = self.store.load(estimate_id).await?;
		let loaded_version = record.version;

		if let Some(ride_request_id) = record.ride_request_id() {
			let reason = if record.is_cancelled() {
				"was cancelled; request a new estimate"
			} else {
				"is already requested"
			};
			return Err(RideError::InvalidState(format!(
				"ride {} from this estimate {}",
				ride_request_id, reason
			)));
		}
		let fare_id = match record.quote.fare_id.as_deref() {
			Some(fare_id) if !fare_id.is_empty() => fare_id.to_string(),
			_ => {
				return Err(RideError::InvalidState(
					"quote carries no fare id; refresh the estimate first".to_string(),
				))
			}
		};

		let token = self
			.tokens
			.get_access_token(session_token, &record.product_id)
			.await?;
		let request = CreateRideRequest::for_trip(fare_id, &record.product_id, &record.original_request);
		let details = self.api.create_request(&token, &request).await?;

		record.mark_requested(details.request_id.clone());
		let record = self
			.store
			.update(estimate_id, loaded_version, record)
			.await
			.inspect_err(|e| {
				error!(
					ride_request_id = %details.request_id,
					error = %e,
					"Ride created upstream but not recorded"
				)
			})?;

		info!(ride_request_id = %details.request_id, "Ride requested");
		Ok(RideStatus {
			ride_id: estimate_id.to_string(),
			stage: RideStage::from_upstream_status(&details.status),
			driver: None,
			vehicle: None,
			location: None,
			pickup_eta: None,
			price: record.quote.price(),
		})
	}

	/// Reads the live status of a requested ride.
	#[instrument(skip(self, session_token))]
	pub async fn get_ride_request(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<RideStatus, RideError> {
		let record = self.store.load(estimate_id).await?;
		let ride_request_id = requested_ride(&record, estimate_id)?;

		let token = self
			.tokens
			.get_access_token(session_token, &record.product_id)
			.await?;
		let details = self.api.get_request(&token, ride_request_id).await?;

		Ok(RideStatus {
			ride_id: estimate_id.to_string(),
			stage: RideStage::from_upstream_status(&details.status),
			location: details.coordinates(),
			driver: details.driver,
			vehicle: details.vehicle,
			pickup_eta: details.pickup_eta,
			price: record.quote.price(),
		})
	}

	/// Cancels a requested ride and reports the fee charged for it.
	#[instrument(skip(self, session_token))]
	pub async fn delete_ride_request(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<CancellationFee, RideError> {
		let record = self.store.load(estimate_id).await?;
		let ride_request_id = requested_ride(&record, estimate_id)?;
		if record.is_cancelled() {
			return Err(RideError::InvalidState(format!(
				"ride {} is already cancelled",
				ride_request_id
			)));
		}

		let token = self
			.tokens
			.get_access_token(session_token, &record.product_id)
			.await?;
		self.api.delete_request(&token, ride_request_id).await?;
		info!(ride_request_id = %ride_request_id, "Ride cancelled");

		let fee = match &record.cancellation_cost {
			Some(cost) => cost.clone(),
			None => self.lookup_cancellation_cost(session_token, &record).await,
		};

		if self.evict_on_cancel {
			if let Err(e) = self.store.remove(estimate_id).await {
				warn!(error = %e, "Failed to evict cancelled estimate");
			}
		} else {
			let version = record.version;
			let mut cancelled = record;
			cancelled.mark_cancelled();
			if let Err(e) = self.store.update(estimate_id, version, cancelled).await {
				warn!(error = %e, "Failed to record cancellation");
			}
		}

		Ok(CancellationFee::new(estimate_id, fee))
	}

	/// Fee from the product's current pricing, or zero when it cannot be read.
	///
	/// Only used after the upstream cancellation succeeded, so it never fails.
	async fn lookup_cancellation_cost(
		&self,
		session_token: &str,
		record: &EstimateRecord,
	) -> CurrencyAmount {
		let fallback = || CurrencyAmount::zero(record.quote.currency.clone());

		let token = match self
			.tokens
			.get_access_token(session_token, &record.product_id)
			.await
		{
			Ok(token) => token,
			Err(e) => {
				warn!(error = %e, "No token for cancellation fee lookup");
				return fallback();
			}
		};

		match self.api.get_product(&token, &record.product_id).await {
			Ok(product) => product
				.pricing
				.map(|pricing| pricing.cancellation_cost())
				.unwrap_or_else(fallback),
			Err(e) => {
				warn!(error = %e, "Cancellation fee lookup failed");
				fallback()
			}
		}
	}
}

fn requested_ride<'a>(record: &'a EstimateRecord, estimate_id: &str) -> Result<&'a str, RideError> {
	record.ride_request_id().ok_or_else(|| {
		RideError::NotFound(format!("no ride requested from estimate {}", estimate_id))
	})
}
