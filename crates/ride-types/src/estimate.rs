//! Estimate records persisted in the cache between calls.
//!
//! An [`EstimateRecord`] is created when a quote is produced for one service,
//! refreshed in place, moved to [`RecordState::Requested`] once a ride has
//! been created from it and to [`RecordState::Cancelled`] once that ride is
//! cancelled. It is the only state the gateway keeps between calls.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A point on the map in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
	#[validate(range(min = -90.0, max = 90.0))]
	pub latitude: f64,
	#[validate(range(min = -180.0, max = 180.0))]
	pub longitude: f64,
}

impl Coordinates {
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self {
			latitude,
			longitude,
		}
	}
}

/// A monetary amount tagged with its ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
	pub amount: Decimal,
	pub currency: String,
}

impl CurrencyAmount {
	pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
		Self {
			amount,
			currency: currency.into(),
		}
	}

	/// A zero amount in the given currency.
	pub fn zero(currency: impl Into<String>) -> Self {
		Self::new(Decimal::ZERO, currency)
	}
}

/// The trip parameters a quote was produced for.
///
/// Kept verbatim so that a refresh can replay the original estimate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
	pub start: Coordinates,
	pub end: Coordinates,
	pub seats: u32,
	/// Every service id requested in the batch that produced this record.
	pub services: Vec<String>,
}

/// Price quote for one service, normalised from either upstream estimate shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
	/// Upstream fare token. Absent for surge quotes, which cannot be booked directly.
	pub fare_id: Option<String>,
	pub distance: f64,
	pub price: Decimal,
	pub currency: String,
}

impl Quote {
	pub fn price(&self) -> CurrencyAmount {
		CurrencyAmount::new(self.price, self.currency.clone())
	}

	/// Whether a ride can be created from this quote.
	pub fn is_bookable(&self) -> bool {
		self.fare_id.as_deref().is_some_and(|id| !id.is_empty())
	}
}

/// Lifecycle tag of an estimate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
	/// A quote exists; no ride has been created from it.
	Quoted,
	/// A ride was created upstream from the quote.
	Requested { ride_request_id: String },
	/// The ride created from the quote was cancelled.
	Cancelled { ride_request_id: String },
}

/// The cache value addressed by an internal estimate id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
	pub quote: Quote,
	pub original_request: TripRequest,
	/// The single service this record is bound to.
	pub product_id: String,
	pub state: RecordState,
	pub cancellation_cost: Option<CurrencyAmount>,
	/// Incremented on every write; used to detect lost updates.
	#[serde(default)]
	pub version: u64,
	pub updated_at: DateTime<Utc>,
}

impl EstimateRecord {
	/// Creates a freshly quoted record.
	pub fn new(
		quote: Quote,
		original_request: TripRequest,
		product_id: impl Into<String>,
		cancellation_cost: Option<CurrencyAmount>,
	) -> Self {
		Self {
			quote,
			original_request,
			product_id: product_id.into(),
			state: RecordState::Quoted,
			cancellation_cost,
			version: 0,
			updated_at: Utc::now(),
		}
	}

	/// The upstream ride request id, set only once a ride has been created.
	///
	/// Kept after cancellation so the upstream view stays readable.
	pub fn ride_request_id(&self) -> Option<&str> {
		match &self.state {
			RecordState::Quoted => None,
			RecordState::Requested { ride_request_id }
			| RecordState::Cancelled { ride_request_id } => Some(ride_request_id),
		}
	}

	/// Whether a ride created from this record is still live.
	pub fn is_requested(&self) -> bool {
		matches!(self.state, RecordState::Requested { .. })
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self.state, RecordState::Cancelled { .. })
	}

	/// Moves the record to the requested state.
	pub fn mark_requested(&mut self, ride_request_id: impl Into<String>) {
		self.state = RecordState::Requested {
			ride_request_id: ride_request_id.into(),
		};
	}

	/// Moves a requested record to the cancelled state. Other states are left as is.
	pub fn mark_cancelled(&mut self) {
		if let RecordState::Requested { ride_request_id } = &self.state {
			self.state = RecordState::Cancelled {
				ride_request_id: ride_request_id.clone(),
			};
		}
	}
}
