//! Registration of the gateway's services with the platform.
//!
//! On startup the gateway announces every configured service to the platform's
//! services endpoint so clients can discover it. A failed registration is
//! reported but does not stop the others.

use async_trait::async_trait;
use ride_types::{ServiceDescriptor, ServiceFeature};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur while registering a service.
#[derive(Debug, Error)]
pub enum RegistryError {
	/// The platform answered but refused the registration.
	#[error("Registration rejected: {0}")]
	Rejected(String),
	/// The platform could not be reached.
	#[error("Services endpoint unavailable: {0}")]
	Transport(String),
	/// The backend could not be constructed.
	#[error("Invalid registry configuration: {0}")]
	Configuration(String),
}

/// One service as announced to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRegistration {
	pub id: String,
	pub name: String,
	/// Name of the provider the gateway fronts.
	pub client_name: String,
	pub features: Vec<ServiceFeature>,
}

impl ServiceRegistration {
	pub fn from_descriptor(descriptor: &ServiceDescriptor, client_name: &str) -> Self {
		Self {
			id: descriptor.id.trim().to_ascii_lowercase(),
			name: descriptor.name.clone(),
			client_name: client_name.to_string(),
			features: descriptor.features.clone(),
		}
	}
}

/// Trait defining the interface for registration backends.
#[async_trait]
pub trait RegistryInterface: Send + Sync {
	async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), RegistryError>;
}

/// Outcome of a registration round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
	pub registered: Vec<String>,
	pub failed: Vec<String>,
}

pub struct RegistryService {
	backend: Box<dyn RegistryInterface>,
	client_name: String,
}

impl RegistryService {
	pub fn new(backend: Box<dyn RegistryInterface>, client_name: impl Into<String>) -> Self {
		Self {
			backend,
			client_name: client_name.into(),
		}
	}

	/// Registers every service in order, continuing past failures.
	#[instrument(skip(self, services), fields(count = services.len()))]
	pub async fn register_all(&self, services: &[ServiceDescriptor]) -> RegistrationReport {
		info!("Registering services");
		let mut report = RegistrationReport::default();

		for descriptor in services {
			let registration = ServiceRegistration::from_descriptor(descriptor, &self.client_name);
			debug!(service = %registration.name, "Registering service");

			match self.backend.register_service(&registration).await {
				Ok(()) => report.registered.push(registration.id),
				Err(e) => {
					warn!(service = %registration.name, error = %e, "Service registration failed");
					report.failed.push(registration.id);
				}
			}
		}

		info!(
			registered = report.registered.len(),
			failed = report.failed.len(),
			"Service registration complete"
		);
		report
	}
}
