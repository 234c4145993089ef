//! In-process cache backend.
//!
//! Entries live in a concurrent map and are expired lazily on access. Time is
//! read from the tokio clock so expiry can be driven deterministically in
//! tests with a paused runtime.

use crate::{CacheEntryOptions, StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Number of writes between sweeps of expired entries.
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug)]
struct Entry {
	value: Vec<u8>,
	absolute_deadline: Option<Instant>,
	sliding_window: Option<Duration>,
	last_access: Instant,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		let past_deadline = self.absolute_deadline.is_some_and(|deadline| now >= deadline);
		let idle_too_long = self
			.sliding_window
			.is_some_and(|window| now.duration_since(self.last_access) >= window);
		past_deadline || idle_too_long
	}
}

/// Memory-backed implementation of [`StorageInterface`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: DashMap<String, Entry>,
	writes: AtomicU64,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of entries currently held, including expired ones not yet swept.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn sweep(&self, now: Instant) {
		let before = self.entries.len();
		self.entries.retain(|_, entry| !entry.is_expired(now));
		debug!(
			removed = before.saturating_sub(self.entries.len()),
			"Swept expired cache entries"
		);
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let now = Instant::now();

		if let Some(mut entry) = self.entries.get_mut(key) {
			if !entry.is_expired(now) {
				entry.last_access = now;
				return Ok(entry.value.clone());
			}
		} else {
			return Err(StorageError::NotFound);
		}

		self.entries.remove_if(key, |_, entry| entry.is_expired(now));
		Err(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		options: &CacheEntryOptions,
	) -> Result<(), StorageError> {
		let now = Instant::now();
		let entry = Entry {
			value,
			absolute_deadline: options.absolute_expiration.map(|ttl| now + ttl),
			sliding_window: options.sliding_expiration,
			last_access: now,
		};
		self.entries.insert(key.to_string(), entry);

		if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
			self.sweep(now);
		}

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let now = Instant::now();
		Ok(self
			.entries
			.get(key)
			.is_some_and(|entry| !entry.is_expired(now)))
	}
}

/// Factory function to create a memory backend from configuration.
///
/// The memory backend takes no configuration parameters.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}
