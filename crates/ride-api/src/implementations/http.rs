//! HTTP backend for the upstream ride API.

use crate::{ApiError, RideApiInterface};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use ride_types::{
	CreateRideRequest, EstimateRequest, EstimateResponse, Product, RideRequestDetails,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTPS client with bearer authentication.
pub struct HttpRideApi {
	client: reqwest::Client,
	base_url: String,
}

impl HttpRideApi {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ApiError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	async fn send(&self, request: RequestBuilder, access_token: &str) -> Result<reqwest::Response, ApiError> {
		let response = request
			.bearer_auth(access_token)
			.send()
			.await
			.map_err(classify_transport_error)?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		debug!(%status, "Upstream call failed");
		if status == StatusCode::NOT_FOUND {
			return Err(ApiError::NotFound(body));
		}
		Err(ApiError::Status {
			status: status.as_u16(),
			body,
		})
	}

	async fn send_json<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
		access_token: &str,
	) -> Result<T, ApiError> {
		self.send(request, access_token)
			.await?
			.json()
			.await
			.map_err(|e| ApiError::Decode(e.to_string()))
	}
}

fn classify_transport_error(e: reqwest::Error) -> ApiError {
	if e.is_connect() {
		ApiError::Connect(e.to_string())
	} else if e.is_timeout() {
		ApiError::Timeout(e.to_string())
	} else {
		ApiError::Transport(e.to_string())
	}
}

#[async_trait]
impl RideApiInterface for HttpRideApi {
	async fn request_estimate(
		&self,
		access_token: &str,
		request: &EstimateRequest,
	) -> Result<EstimateResponse, ApiError> {
		let builder = self.client.post(self.url("/estimates")).json(request);
		self.send_json(builder, access_token).await
	}

	async fn get_product(&self, access_token: &str, product_id: &str) -> Result<Product, ApiError> {
		let builder = self.client.get(self.url(&format!("/products/{}", product_id)));
		self.send_json(builder, access_token).await
	}

	async fn create_request(
		&self,
		access_token: &str,
		request: &CreateRideRequest,
	) -> Result<RideRequestDetails, ApiError> {
		let builder = self.client.post(self.url("/requests")).json(request);
		self.send_json(builder, access_token).await
	}

	async fn get_request(
		&self,
		access_token: &str,
		request_id: &str,
	) -> Result<RideRequestDetails, ApiError> {
		let builder = self.client.get(self.url(&format!("/requests/{}", request_id)));
		self.send_json(builder, access_token).await
	}

	async fn delete_request(&self, access_token: &str, request_id: &str) -> Result<(), ApiError> {
		let builder = self.client.delete(self.url(&format!("/requests/{}", request_id)));
		self.send(builder, access_token).await.map(|_| ())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn api(server: &MockServer) -> HttpRideApi {
		HttpRideApi::new(&format!("{}/v1.2/", server.uri()), Duration::from_secs(2)).unwrap()
	}

	fn estimate_request() -> EstimateRequest {
		EstimateRequest {
			product_id: "prod-x".to_string(),
			start_latitude: 37.77,
			start_longitude: -122.41,
			end_latitude: 37.79,
			end_longitude: -122.40,
			seat_count: 2,
		}
	}

	#[tokio::test]
	async fn test_estimate_sends_bearer_and_decodes_surge() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1.2/estimates"))
			.and(header("authorization", "Bearer tok"))
			.and(body_partial_json(json!({ "product_id": "prod-x", "seat_count": 2 })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"estimate": { "high_estimate": 21, "currency_code": "USD" },
				"trip": { "distance_estimate": 3.2 }
			})))
			.expect(1)
			.mount(&server)
			.await;

		let response = api(&server)
			.request_estimate("tok", &estimate_request())
			.await
			.unwrap();
		let quote = response.into_quote();
		assert_eq!(quote.fare_id, None);
		assert_eq!(quote.price, Decimal::new(21, 0));
	}

	#[tokio::test]
	async fn test_product_lookup() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/v1.2/products/prod-x"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"product_id": "prod-x",
				"display_name": "UberX",
				"capacity": 4,
				"pricing": { "cancellation_fee": 5, "currency_code": "USD" }
			})))
			.mount(&server)
			.await;

		let product = api(&server).get_product("tok", "prod-x").await.unwrap();
		assert_eq!(product.capacity, 4);
		assert!(!product.shared);
		assert_eq!(
			product.pricing.map(|p| p.cancellation_cost().amount),
			Some(Decimal::new(5, 0))
		);
	}

	#[tokio::test]
	async fn test_status_codes_are_classified() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/v1.2/requests/missing"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/v1.2/requests/busy"))
			.respond_with(ResponseTemplate::new(503).set_body_string("try later"))
			.mount(&server)
			.await;

		let api = api(&server);
		assert!(matches!(
			api.get_request("tok", "missing").await,
			Err(ApiError::NotFound(_))
		));
		let busy = api.get_request("tok", "busy").await.unwrap_err();
		assert!(busy.is_transient());
	}

	#[tokio::test]
	async fn test_create_and_delete_ride() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1.2/requests"))
			.and(body_partial_json(json!({ "fare_id": "fare-1" })))
			.respond_with(ResponseTemplate::new(202).set_body_json(json!({
				"request_id": "req-9",
				"status": "processing"
			})))
			.mount(&server)
			.await;
		Mock::given(method("DELETE"))
			.and(path("/v1.2/requests/req-9"))
			.respond_with(ResponseTemplate::new(204))
			.expect(1)
			.mount(&server)
			.await;

		let api = api(&server);
		let request = CreateRideRequest {
			fare_id: "fare-1".to_string(),
			product_id: "prod-x".to_string(),
			start_latitude: 37.77,
			start_longitude: -122.41,
			end_latitude: 37.79,
			end_longitude: -122.40,
			seat_count: 1,
		};
		let created = api.create_request("tok", &request).await.unwrap();
		assert_eq!(created.request_id, "req-9");
		api.delete_request("tok", "req-9").await.unwrap();
	}

	#[tokio::test]
	async fn test_garbage_body_is_decode_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
			.mount(&server)
			.await;

		let result = api(&server).get_product("tok", "prod-x").await;
		assert!(matches!(result, Err(ApiError::Decode(_))));
	}

	#[tokio::test]
	async fn test_connection_refused_is_connect_error() {
		let api = HttpRideApi::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
		let result = api.get_request("tok", "req-1").await;
		assert!(matches!(result, Err(e) if e.is_connect()));
	}
}
