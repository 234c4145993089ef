//! Ride lifecycle types returned to callers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Coordinates, CurrencyAmount};

/// Closed set of ride stages exposed to callers.
///
/// Always re-derived from the upstream status string on each poll; the gateway
/// never records a stage transition itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStage {
	Pending,
	Accepted,
	Cancelled,
	Completed,
	Unknown,
}

impl RideStage {
	/// Maps an upstream status string by exact match.
	///
	/// Unrecognised strings, including the empty string and differently cased
	/// variants of known statuses, map to [`RideStage::Unknown`].
	pub fn from_upstream_status(status: &str) -> Self {
		match status {
			"processing" => Self::Pending,
			"accepted" => Self::Accepted,
			"no drivers available" => Self::Cancelled,
			"completed" => Self::Completed,
			_ => Self::Unknown,
		}
	}
}

/// Driver assigned to a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
	pub name: String,
	#[serde(default)]
	pub phone_number: Option<String>,
	#[serde(default)]
	pub rating: Option<f64>,
	#[serde(default)]
	pub picture_url: Option<String>,
}

/// Vehicle used for a ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
	pub make: String,
	pub model: String,
	pub license_plate: String,
	#[serde(default)]
	pub picture_url: Option<String>,
}

/// Live vehicle position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleLocation {
	pub latitude: f64,
	pub longitude: f64,
	#[serde(default)]
	pub bearing: Option<i32>,
}

impl From<&VehicleLocation> for Coordinates {
	fn from(location: &VehicleLocation) -> Self {
		Coordinates::new(location.latitude, location.longitude)
	}
}

/// Status of a ride as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStatus {
	/// The internal estimate id, reused as the ride identifier.
	pub ride_id: String,
	pub stage: RideStage,
	pub driver: Option<Driver>,
	pub vehicle: Option<Vehicle>,
	pub location: Option<Coordinates>,
	/// Minutes until pickup, when known.
	pub pickup_eta: Option<u32>,
	/// Price taken from the cached quote.
	pub price: CurrencyAmount,
}

/// Fee charged for cancelling a ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationFee {
	pub ride_id: String,
	pub fee: CurrencyAmount,
}

impl CancellationFee {
	/// Builds a fee, clamping negative amounts to zero.
	pub fn new(ride_id: impl Into<String>, fee: CurrencyAmount) -> Self {
		let amount = fee.amount.max(Decimal::ZERO);
		Self {
			ride_id: ride_id.into(),
			fee: CurrencyAmount::new(amount, fee.currency),
		}
	}
}
