//! In-memory fakes of the token service and the ride API.

use crate::{RideBuilder, RideEngine};
use async_trait::async_trait;
use futures::StreamExt;
use ride_api::{ApiError, RideApiInterface};
use ride_config::{ConfigFormat, GatewayConfig};
use ride_storage::implementations::memory;
use ride_token::{TokenError, TokenInterface};
use ride_types::{
	CreateRideRequest, CurrencyAmount, Driver, EstimateModel, EstimateRecord, EstimateRequest,
	EstimateResponse, EstimateWithSurge, EstimateWithoutSurge, Fare, GetEstimatesRequest, Product,
	ProductPricing, RideRequestDetails, SurgeEstimate, TripEstimate, VehicleLocation,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const X: &str = "2d1d002b-d4d0-4411-98e1-673b244878b2";
pub const POOL: &str = "26546650-e557-4a7b-86e7-6a3942445247";
pub const BLACK: &str = "d4abaae7-f4d6-4152-91cc-77523e8165a4";
pub const UNKNOWN: &str = "00000000-0000-0000-0000-000000000000";

const CONFIG: &str = r#"
[ride_api]
base_url = "http://ride-api.test"

[token_service]
base_url = "http://users.test"

[estimates]
pacing_ms = 0
client_id = "test-client"

[retry]
max_retries = 0

[[services]]
id = "2d1d002b-d4d0-4411-98e1-673b244878b2"
name = "UberX"
features = ["professional_driver"]

[[services]]
id = "26546650-e557-4a7b-86e7-6a3942445247"
name = "UberPOOL"
features = ["shared"]

[[services]]
id = "d4abaae7-f4d6-4152-91cc-77523e8165a4"
name = "UberBLACK"
features = ["professional_driver"]
"#;

pub fn surge_price() -> CurrencyAmount {
	CurrencyAmount::new(Decimal::new(3150, 2), "USD")
}

pub fn estimates_request(services: &[&str], seats: u32) -> GetEstimatesRequest {
	GetEstimatesRequest {
		start_point: ride_types::Coordinates::new(37.7752, -122.4185),
		end_point: ride_types::Coordinates::new(37.7899, -122.4005),
		seats,
		services: services.iter().map(|s| s.to_string()).collect(),
	}
}

#[derive(Default)]
pub struct FakeTokens {
	failing: Mutex<HashSet<String>>,
	calls: AtomicUsize,
}

impl FakeTokens {
	pub fn fail_for(&self, service_id: &str) {
		self.failing.lock().unwrap().insert(service_id.to_string());
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

struct TokenBackend(Arc<FakeTokens>);

#[async_trait]
impl TokenInterface for TokenBackend {
	async fn fetch_access_token(
		&self,
		session_token: &str,
		service_id: &str,
	) -> Result<String, TokenError> {
		self.0.calls.fetch_add(1, Ordering::SeqCst);
		if self.0.failing.lock().unwrap().contains(service_id) {
			return Ok(String::new());
		}
		Ok(format!("access-{}-{}", session_token, service_id))
	}
}

pub struct FakeRideApi {
	products: Mutex<HashMap<String, Product>>,
	fares: Mutex<HashMap<String, String>>,
	surging: Mutex<HashSet<String>>,
	failing_estimates: Mutex<HashSet<String>>,
	estimate_calls: Mutex<HashMap<String, usize>>,
	created: Mutex<Vec<CreateRideRequest>>,
	deleted: Mutex<Vec<String>>,
	ride_status: Mutex<(String, Option<Driver>)>,
}

impl FakeRideApi {
	fn new() -> Self {
		let products = [(X, "UberX", 4, false), (POOL, "UberPOOL", 2, true), (BLACK, "UberBLACK", 4, false)]
			.into_iter()
			.map(|(id, name, capacity, shared)| {
				let product = Product {
					product_id: id.to_string(),
					display_name: name.to_string(),
					capacity,
					shared,
					description: None,
					pricing: Some(ProductPricing {
						cancellation_fee: Decimal::new(5, 0),
						currency_code: "USD".to_string(),
					}),
				};
				(id.to_string(), product)
			})
			.collect();

		Self {
			products: Mutex::new(products),
			fares: Mutex::new(HashMap::new()),
			surging: Mutex::new(HashSet::new()),
			failing_estimates: Mutex::new(HashSet::new()),
			estimate_calls: Mutex::new(HashMap::new()),
			created: Mutex::new(Vec::new()),
			deleted: Mutex::new(Vec::new()),
			ride_status: Mutex::new(("processing".to_string(), None)),
		}
	}

	pub fn set_fare(&self, service_id: &str, fare_id: &str) {
		self.surging.lock().unwrap().remove(service_id);
		self.fares
			.lock()
			.unwrap()
			.insert(service_id.to_string(), fare_id.to_string());
	}

	pub fn surge(&self, service_id: &str) {
		self.surging.lock().unwrap().insert(service_id.to_string());
	}

	pub fn fail_estimates_for(&self, service_id: &str) {
		self.failing_estimates
			.lock()
			.unwrap()
			.insert(service_id.to_string());
	}

	pub fn set_cancellation_fee(&self, service_id: &str, amount: i64) {
		if let Some(product) = self.products.lock().unwrap().get_mut(service_id) {
			product.pricing = Some(ProductPricing {
				cancellation_fee: Decimal::new(amount, 0),
				currency_code: "USD".to_string(),
			});
		}
	}

	pub fn clear_pricing(&self, service_id: &str) {
		if let Some(product) = self.products.lock().unwrap().get_mut(service_id) {
			product.pricing = None;
		}
	}

	pub fn set_ride_status(&self, status: &str, driver: Option<Driver>) {
		*self.ride_status.lock().unwrap() = (status.to_string(), driver);
	}

	pub fn estimate_calls(&self, service_id: &str) -> usize {
		self.estimate_calls
			.lock()
			.unwrap()
			.get(service_id)
			.copied()
			.unwrap_or(0)
	}

	pub fn created_requests(&self) -> Vec<CreateRideRequest> {
		self.created.lock().unwrap().clone()
	}

	pub fn deleted_requests(&self) -> Vec<String> {
		self.deleted.lock().unwrap().clone()
	}
}

struct ApiBackend(Arc<FakeRideApi>);

#[async_trait]
impl RideApiInterface for ApiBackend {
	async fn request_estimate(
		&self,
		_access_token: &str,
		request: &EstimateRequest,
	) -> Result<EstimateResponse, ApiError> {
		let id = request.product_id.as_str();
		*self
			.0
			.estimate_calls
			.lock()
			.unwrap()
			.entry(id.to_string())
			.or_default() += 1;

		if self.0.failing_estimates.lock().unwrap().contains(id) {
			return Err(ApiError::Status {
				status: 500,
				body: "estimate unavailable".to_string(),
			});
		}

		let trip = TripEstimate {
			distance_estimate: 2.5,
			distance_unit: Some("mile".to_string()),
			duration_estimate: Some(600),
		};

		if self.0.surging.lock().unwrap().contains(id) {
			return Ok(EstimateResponse::Surge(EstimateWithSurge {
				estimate: SurgeEstimate {
					high_estimate: Decimal::new(3150, 2),
					low_estimate: Some(Decimal::new(2400, 2)),
					currency_code: "USD".to_string(),
					surge_multiplier: Some(1.5),
					surge_confirmation_id: Some("surge-1".to_string()),
				},
				trip,
				pickup_estimate: Some(4),
			}));
		}

		let fare_id = self
			.0
			.fares
			.lock()
			.unwrap()
			.get(id)
			.cloned()
			.unwrap_or_else(|| {
				let name = self
					.0
					.products
					.lock()
					.unwrap()
					.get(id)
					.map(|p| p.display_name.trim_start_matches("Uber").to_string())
					.unwrap_or_default();
				format!("fare-{}", name)
			});

		Ok(EstimateResponse::NonSurge(EstimateWithoutSurge {
			fare: Fare {
				fare_id,
				value: Decimal::new(1275, 2),
				currency_code: "USD".to_string(),
				expires_at: None,
			},
			trip,
			pickup_estimate: Some(3),
		}))
	}

	async fn get_product(&self, _access_token: &str, product_id: &str) -> Result<Product, ApiError> {
		self.0
			.products
			.lock()
			.unwrap()
			.get(product_id)
			.cloned()
			.ok_or_else(|| ApiError::NotFound(product_id.to_string()))
	}

	async fn create_request(
		&self,
		_access_token: &str,
		request: &CreateRideRequest,
	) -> Result<RideRequestDetails, ApiError> {
		let mut created = self.0.created.lock().unwrap();
		created.push(request.clone());
		Ok(RideRequestDetails {
			request_id: format!("req-{}", created.len()),
			status: "processing".to_string(),
			driver: None,
			vehicle: None,
			location: None,
			pickup_eta: None,
		})
	}

	async fn get_request(
		&self,
		_access_token: &str,
		request_id: &str,
	) -> Result<RideRequestDetails, ApiError> {
		let (status, driver) = self.0.ride_status.lock().unwrap().clone();
		Ok(RideRequestDetails {
			request_id: request_id.to_string(),
			status,
			driver,
			vehicle: None,
			location: Some(VehicleLocation {
				latitude: 37.776,
				longitude: -122.417,
				bearing: Some(90),
			}),
			pickup_eta: Some(2),
		})
	}

	async fn delete_request(&self, _access_token: &str, request_id: &str) -> Result<(), ApiError> {
		self.0.deleted.lock().unwrap().push(request_id.to_string());
		Ok(())
	}
}

/// An engine wired to fakes, with handles on the fakes.
pub struct Harness {
	pub engine: RideEngine,
	pub tokens: Arc<FakeTokens>,
	pub api: Arc<FakeRideApi>,
}

impl Harness {
	pub fn new() -> Self {
		Self::with(|_| {})
	}

	pub fn with_pacing(pacing: std::time::Duration) -> Self {
		Self::with(|config| config.estimates.pacing_ms = pacing.as_millis() as u64)
	}

	pub fn with(customize: impl FnOnce(&mut GatewayConfig)) -> Self {
		let mut config = ride_config::parse_config(CONFIG, ConfigFormat::Toml).unwrap();
		customize(&mut config);

		let tokens = Arc::new(FakeTokens::default());
		let api = Arc::new(FakeRideApi::new());

		let token_handle = tokens.clone();
		let api_handle = api.clone();
		let engine = RideBuilder::new(config)
			.with_storage_factory("memory", memory::create_storage)
			.with_token_factory(move |_| Ok(Box::new(TokenBackend(token_handle.clone()))))
			.with_ride_api_factory(move |_| Ok(Box::new(ApiBackend(api_handle.clone()))))
			.build()
			.unwrap();

		Self {
			engine,
			tokens,
			api,
		}
	}

	/// Quotes a single service and returns its quote.
	pub async fn estimate(&self, service_id: &str) -> EstimateModel {
		let quotes: Vec<_> = self
			.engine
			.get_estimates("session".to_string(), estimates_request(&[service_id], 1))
			.unwrap()
			.collect()
			.await;
		quotes.into_iter().next().unwrap()
	}

	pub async fn record(&self, service_id: &str) -> EstimateRecord {
		self.engine
			.store()
			.load(&crate::identifier::resolve(service_id))
			.await
			.unwrap()
	}
}
