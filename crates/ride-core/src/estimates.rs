//! Quote production and refresh.
//!
//! A GetEstimates call walks the requested services one at a time. Each
//! service that yields a quote gets a cache record and one streamed item; any
//! service that fails along the way is logged and left out. The stream itself
//! never fails once validation has passed.

use crate::records::EstimateStore;
use crate::{identifier, RideError};
use futures::stream::BoxStream;
use ride_api::RideApiService;
use ride_token::TokenService;
use ride_types::{
	Coordinates, EstimateModel, EstimateRecord, EstimateRequest, GetEstimatesRequest, Product,
	ServiceRegistry, TripRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Settings that shape emitted quotes.
#[derive(Debug, Clone)]
pub struct EstimateSettings {
	/// Delay between two consecutive services of one call.
	pub pacing: Duration,
	pub client_id: String,
	pub deep_link_base: String,
}

#[derive(Clone)]
pub struct EstimateOrchestrator {
	store: Arc<EstimateStore>,
	tokens: Arc<TokenService>,
	api: Arc<RideApiService>,
	registry: Arc<ServiceRegistry>,
	settings: Arc<EstimateSettings>,
}

impl EstimateOrchestrator {
	pub fn new(
		store: Arc<EstimateStore>,
		tokens: Arc<TokenService>,
		api: Arc<RideApiService>,
		registry: Arc<ServiceRegistry>,
		settings: EstimateSettings,
	) -> Self {
		Self {
			store,
			tokens,
			api,
			registry,
			settings: Arc::new(settings),
		}
	}

	/// Validates the request and returns the stream of quotes.
	///
	/// Services are attempted in request order, sequentially.
	pub fn get_estimates(
		&self,
		session_token: String,
		request: GetEstimatesRequest,
	) -> Result<BoxStream<'static, EstimateModel>, RideError> {
		request.validate()?;

		let this = self.clone();
		let trip = request.trip();
		info!(services = trip.services.len(), seats = trip.seats, "Estimating trip");

		let stream = async_stream::stream! {
			let mut emitted = 0usize;
			for (index, service_id) in trip.services.iter().enumerate() {
				if index > 0 && !this.settings.pacing.is_zero() {
					tokio::time::sleep(this.settings.pacing).await;
				}

				match this.estimate_service(&session_token, &trip, service_id).await {
					Ok(model) => {
						emitted += 1;
						yield model;
					}
					Err(e) => {
						warn!(service_id = %service_id, error = %e, "Skipping service");
					}
				}
			}
			debug!(emitted, requested = trip.services.len(), "Estimate stream finished");
		};

		Ok(Box::pin(stream))
	}

	#[instrument(skip(self, session_token, trip))]
	pub(crate) async fn estimate_service(
		&self,
		session_token: &str,
		trip: &TripRequest,
		service_id: &str,
	) -> Result<EstimateModel, RideError> {
		let service_id = service_id.trim();
		if !self.registry.contains(service_id) {
			return Err(RideError::Validation(format!("unknown service {}", service_id)));
		}

		let token = self.tokens.get_access_token(session_token, service_id).await?;
		let response = self
			.api
			.request_estimate(&token, &EstimateRequest::for_trip(trip, service_id))
			.await?;
		let quote = response.into_quote();

		let token = self.tokens.get_access_token(session_token, service_id).await?;
		let product = self.api.get_product(&token, service_id).await?;

		let cancellation_cost = product.pricing.as_ref().map(|p| p.cancellation_cost());
		let id = identifier::resolve(service_id);
		let record = EstimateRecord::new(quote, trip.clone(), service_id, cancellation_cost);
		let record = self.store.insert(&id, record).await?;

		Ok(self.to_model(&id, &record, &product))
	}

	/// Re-quotes a stored estimate and overwrites its record in place.
	#[instrument(skip(self, session_token))]
	pub async fn refresh_estimate(
		&self,
		session_token: &str,
		estimate_id: &str,
	) -> Result<EstimateModel, RideError> {
		let mut record = self.store.load(estimate_id).await?;
		let loaded_version = record.version;

		let token = self
			.tokens
			.get_access_token(session_token, &record.product_id)
			.await?;
		let request = EstimateRequest::for_trip(&record.original_request, record.product_id.clone());
		let response = self.api.request_estimate(&token, &request).await?;

		let token = self
			.tokens
			.get_access_token(session_token, &record.product_id)
			.await?;
		let product = self.api.get_product(&token, &record.product_id).await?;

		record.quote = response.into_quote();
		if record.cancellation_cost.is_none() {
			record.cancellation_cost = product.pricing.as_ref().map(|p| p.cancellation_cost());
		}

		let record = self.store.update(estimate_id, loaded_version, record).await?;
		info!(bookable = record.quote.is_bookable(), "Estimate refreshed");
		Ok(self.to_model(estimate_id, &record, &product))
	}

	fn to_model(&self, estimate_id: &str, record: &EstimateRecord, product: &Product) -> EstimateModel {
		let trip = &record.original_request;
		let display_name = if product.display_name.is_empty() {
			self.registry
				.display_name(&record.product_id)
				.unwrap_or(&record.product_id)
				.to_string()
		} else {
			product.display_name.clone()
		};

		EstimateModel {
			estimate_id: estimate_id.to_string(),
			product_id: record.product_id.clone(),
			display_name,
			price_details: record.quote.price(),
			distance: record.quote.distance,
			seats: seats_for(product, trip.seats),
			request_url: self.deep_link(trip, &record.product_id),
			way_points: vec![trip.start, trip.end],
			cancellation_cost: record.cancellation_cost.clone(),
			created_time: record.updated_at,
		}
	}

	fn deep_link(&self, trip: &TripRequest, product_id: &str) -> String {
		let Coordinates {
			latitude: pickup_lat,
			longitude: pickup_lng,
		} = trip.start;
		let Coordinates {
			latitude: dropoff_lat,
			longitude: dropoff_lng,
		} = trip.end;

		format!(
			"{}?client_id={}&action=setPickup&pickup[latitude]={}&pickup[longitude]={}&dropoff[latitude]={}&dropoff[longitude]={}&product_id={}",
			self.settings.deep_link_base,
			self.settings.client_id,
			pickup_lat,
			pickup_lng,
			dropoff_lat,
			dropoff_lng,
			product_id
		)
	}
}

/// Seats shown for a quote: shared products carry exactly the requested
/// seats, private ones always carry the whole vehicle.
pub fn seats_for(product: &Product, requested: u32) -> u32 {
	if product.shared {
		requested
	} else {
		product.capacity
	}
}
