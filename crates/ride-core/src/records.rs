//! Typed access to estimate records in the cache.

use crate::RideError;
use chrono::Utc;
use ride_storage::{StorageError, StorageService};
use ride_types::EstimateRecord;
use tracing::{debug, warn};

const NAMESPACE: &str = "estimates";

/// Estimate records keyed by internal estimate id.
///
/// The cache has no compare-and-swap. Updates re-read the stored version just
/// before writing and refuse to write over a newer one, which narrows but does
/// not close the window for lost updates.
pub struct EstimateStore {
	storage: StorageService,
}

impl EstimateStore {
	pub fn new(storage: StorageService) -> Self {
		Self { storage }
	}

	/// Loads a live record.
	///
	/// Missing, expired and undecodable records are all reported as not found.
	pub async fn load(&self, id: &str) -> Result<EstimateRecord, RideError> {
		match self.storage.retrieve::<EstimateRecord>(NAMESPACE, id).await {
			Ok(record) => Ok(record),
			Err(StorageError::NotFound) => Err(not_found(id)),
			Err(StorageError::Serialization(e)) => {
				warn!(estimate_id = %id, error = %e, "Discarding undecodable estimate record");
				Err(not_found(id))
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Writes a freshly quoted record over whatever was stored under `id`.
	///
	/// The version continues from the replaced record so that a writer holding
	/// the old one notices the change. A live ride on the replaced record is
	/// carried over, so it can still be polled and cancelled.
	pub async fn insert(&self, id: &str, mut record: EstimateRecord) -> Result<EstimateRecord, RideError> {
		let previous = match self.storage.retrieve::<EstimateRecord>(NAMESPACE, id).await {
			Ok(existing) => Some(existing),
			Err(StorageError::Backend(e)) => return Err(RideError::Storage(e)),
			Err(_) => None,
		};

		if let Some(existing) = &previous {
			if existing.is_requested() {
				debug!(estimate_id = %id, "Keeping live ride on re-quoted estimate");
				record.state = existing.state.clone();
			}
		}

		record.version = previous.map_or(0, |existing| existing.version + 1);
		record.updated_at = Utc::now();
		self.storage.store(NAMESPACE, id, &record).await?;
		debug!(estimate_id = %id, version = record.version, "Stored estimate record");
		Ok(record)
	}

	/// Overwrites a record that was loaded at `expected_version`.
	pub async fn update(
		&self,
		id: &str,
		expected_version: u64,
		mut record: EstimateRecord,
	) -> Result<EstimateRecord, RideError> {
		let current = self.load(id).await?;
		if current.version != expected_version {
			return Err(RideError::Conflict(format!(
				"estimate {} changed concurrently (version {} != {})",
				id, current.version, expected_version
			)));
		}

		record.version = expected_version + 1;
		record.updated_at = Utc::now();
		self.storage.store(NAMESPACE, id, &record).await?;
		debug!(estimate_id = %id, version = record.version, "Updated estimate record");
		Ok(record)
	}

	pub async fn remove(&self, id: &str) -> Result<(), RideError> {
		self.storage.remove(NAMESPACE, id).await?;
		Ok(())
	}
}

fn not_found(id: &str) -> RideError {
	RideError::NotFound(format!("estimate {}", id))
}
