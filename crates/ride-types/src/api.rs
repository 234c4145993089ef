//! Request and response types of the gateway's HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Coordinates, CurrencyAmount, ServiceDescriptor, TripRequest};

/// Request for quotes across one or more services.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetEstimatesRequest {
	#[validate(nested)]
	pub start_point: Coordinates,
	#[validate(nested)]
	pub end_point: Coordinates,
	#[validate(range(min = 1, max = 8))]
	pub seats: u32,
	/// Service ids to quote, in the order they should be attempted.
	#[validate(length(min = 1))]
	pub services: Vec<String>,
}

impl GetEstimatesRequest {
	pub fn trip(&self) -> TripRequest {
		TripRequest {
			start: self.start_point,
			end: self.end_point,
			seats: self.seats,
			services: self.services.clone(),
		}
	}
}

/// One quote as emitted to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateModel {
	/// Internal estimate id; later used as the ride id.
	pub estimate_id: String,
	pub product_id: String,
	pub display_name: String,
	pub price_details: CurrencyAmount,
	pub distance: f64,
	pub seats: u32,
	/// Deep link that opens the booking flow in the provider's app.
	pub request_url: String,
	pub way_points: Vec<Coordinates>,
	pub cancellation_cost: Option<CurrencyAmount>,
	pub created_time: DateTime<Utc>,
}

/// Registered services as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListing {
	pub services: Vec<ServiceDescriptor>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine readable error code.
	pub error: String,
	/// Human readable description.
	pub message: String,
}
