//! Registry of the ride services this gateway is allowed to quote.
//!
//! The registry is built once from configuration and handed out behind an
//! `Arc`; it is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Capabilities advertised for a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFeature {
	Shared,
	ProfessionalDriver,
}

/// One registered ride service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub features: Vec<ServiceFeature>,
}

/// Immutable lookup of known service ids.
///
/// Ids are matched after trimming and lowercasing, so the textual form of a
/// UUID does not matter.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
	services: HashMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
	pub fn new(descriptors: impl IntoIterator<Item = ServiceDescriptor>) -> Self {
		let services = descriptors
			.into_iter()
			.map(|descriptor| (normalize(&descriptor.id), descriptor))
			.collect();
		Self { services }
	}

	pub fn get(&self, service_id: &str) -> Option<&ServiceDescriptor> {
		self.services.get(&normalize(service_id))
	}

	pub fn contains(&self, service_id: &str) -> bool {
		self.get(service_id).is_some()
	}

	/// Display name of a registered service.
	pub fn display_name(&self, service_id: &str) -> Option<&str> {
		self.get(service_id).map(|descriptor| descriptor.name.as_str())
	}

	/// All registered services, sorted by name.
	pub fn descriptors(&self) -> Vec<&ServiceDescriptor> {
		let mut descriptors: Vec<_> = self.services.values().collect();
		descriptors.sort_by(|a, b| a.name.cmp(&b.name));
		descriptors
	}

	pub fn len(&self) -> usize {
		self.services.len()
	}

	pub fn is_empty(&self) -> bool {
		self.services.is_empty()
	}
}

fn normalize(service_id: &str) -> String {
	service_id.trim().to_ascii_lowercase()
}
