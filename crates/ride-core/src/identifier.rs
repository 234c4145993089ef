//! Maps service ids to internal estimate ids.
//!
//! The internal id is a name-based UUID, so the same service always maps to
//! the same cache key no matter which trip or call produced it.

use uuid::Uuid;

/// Namespace under which service ids are hashed.
const ESTIMATE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c4a_93b7_4e0f_a1c5_7d2e_8b90_3f64);

/// Returns the internal estimate id for a service id.
///
/// Surrounding whitespace and letter case of the service id are ignored.
pub fn resolve(service_id: &str) -> String {
	let normalized = service_id.trim().to_ascii_lowercase();
	Uuid::new_v5(&ESTIMATE_NAMESPACE, normalized.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_resolve_is_deterministic() {
		let id = "d4abaae7-f4d6-4152-91cc-77523e8165a4";
		assert_eq!(resolve(id), resolve(id));
		assert_eq!(resolve(id), resolve(" D4ABAAE7-F4D6-4152-91CC-77523E8165A4 "));
	}

	#[test]
	fn test_distinct_services_do_not_collide() {
		let ids = [
			"d4abaae7-f4d6-4152-91cc-77523e8165a4",
			"26546650-e557-4a7b-86e7-6a3942445247",
			"2d1d002b-d4d0-4411-98e1-673b244878b2",
		];
		let resolved: std::collections::HashSet<_> = ids.iter().map(|id| resolve(id)).collect();
		assert_eq!(resolved.len(), ids.len());
	}

	#[test]
	fn test_resolved_id_is_a_uuid() {
		let id = resolve("anything");
		assert!(Uuid::parse_str(&id).is_ok());
		assert_ne!(id, "anything");
	}
}
