//! Wire types of the upstream ride-hailing API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Coordinates, CurrencyAmount, Driver, Quote, TripRequest, Vehicle, VehicleLocation};

/// Body of an upstream estimate call, tagged with a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRequest {
	pub product_id: String,
	pub start_latitude: f64,
	pub start_longitude: f64,
	pub end_latitude: f64,
	pub end_longitude: f64,
	pub seat_count: u32,
}

impl EstimateRequest {
	pub fn for_trip(trip: &TripRequest, product_id: impl Into<String>) -> Self {
		Self {
			product_id: product_id.into(),
			start_latitude: trip.start.latitude,
			start_longitude: trip.start.longitude,
			end_latitude: trip.end.latitude,
			end_longitude: trip.end.longitude,
			seat_count: trip.seats,
		}
	}
}

/// Trip metrics shared by both estimate shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEstimate {
	pub distance_estimate: f64,
	#[serde(default)]
	pub distance_unit: Option<String>,
	#[serde(default)]
	pub duration_estimate: Option<u32>,
}

/// Upfront fare returned when no surge pricing applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fare {
	pub fare_id: String,
	pub value: Decimal,
	pub currency_code: String,
	#[serde(default)]
	pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateWithoutSurge {
	pub fare: Fare,
	pub trip: TripEstimate,
	#[serde(default)]
	pub pickup_estimate: Option<u32>,
}

/// Price range returned under surge pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeEstimate {
	pub high_estimate: Decimal,
	#[serde(default)]
	pub low_estimate: Option<Decimal>,
	pub currency_code: String,
	#[serde(default)]
	pub surge_multiplier: Option<f64>,
	#[serde(default)]
	pub surge_confirmation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateWithSurge {
	pub estimate: SurgeEstimate,
	pub trip: TripEstimate,
	#[serde(default)]
	pub pickup_estimate: Option<u32>,
}

/// The two shapes an upstream estimate can take.
///
/// Non-surge responses carry a `fare` object, surge responses an `estimate`
/// object; the variants are tried in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EstimateResponse {
	NonSurge(EstimateWithoutSurge),
	Surge(EstimateWithSurge),
}

impl EstimateResponse {
	/// Normalises either shape into a [`Quote`].
	///
	/// Surge quotes are priced at the high end of the range and carry no fare id.
	pub fn into_quote(self) -> Quote {
		match self {
			EstimateResponse::NonSurge(estimate) => Quote {
				fare_id: Some(estimate.fare.fare_id),
				distance: estimate.trip.distance_estimate,
				price: estimate.fare.value,
				currency: estimate.fare.currency_code,
			},
			EstimateResponse::Surge(estimate) => Quote {
				fare_id: None,
				distance: estimate.trip.distance_estimate,
				price: estimate.estimate.high_estimate,
				currency: estimate.estimate.currency_code,
			},
		}
	}
}

/// Pricing metadata attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPricing {
	pub cancellation_fee: Decimal,
	pub currency_code: String,
}

impl ProductPricing {
	pub fn cancellation_cost(&self) -> CurrencyAmount {
		CurrencyAmount::new(self.cancellation_fee, self.currency_code.clone())
	}
}

/// Capacity and display metadata for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
	pub product_id: String,
	pub display_name: String,
	pub capacity: u32,
	#[serde(default)]
	pub shared: bool,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub pricing: Option<ProductPricing>,
}

/// Body of an upstream ride creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRideRequest {
	pub fare_id: String,
	pub product_id: String,
	pub start_latitude: f64,
	pub start_longitude: f64,
	pub end_latitude: f64,
	pub end_longitude: f64,
	pub seat_count: u32,
}

impl CreateRideRequest {
	pub fn for_trip(
		fare_id: impl Into<String>,
		product_id: impl Into<String>,
		trip: &TripRequest,
	) -> Self {
		Self {
			fare_id: fare_id.into(),
			product_id: product_id.into(),
			start_latitude: trip.start.latitude,
			start_longitude: trip.start.longitude,
			end_latitude: trip.end.latitude,
			end_longitude: trip.end.longitude,
			seat_count: trip.seats,
		}
	}
}

/// Ride request as reported by the upstream API on create and get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequestDetails {
	pub request_id: String,
	#[serde(default)]
	pub status: String,
	#[serde(default)]
	pub driver: Option<Driver>,
	#[serde(default)]
	pub vehicle: Option<Vehicle>,
	#[serde(default)]
	pub location: Option<VehicleLocation>,
	#[serde(default)]
	pub pickup_eta: Option<u32>,
}

impl RideRequestDetails {
	pub fn coordinates(&self) -> Option<Coordinates> {
		self.location.as_ref().map(Coordinates::from)
	}
}
