//! Cache storage for the ride gateway.
//!
//! This module provides the byte-oriented, TTL-based cache the gateway uses as
//! its only memory between calls, plus a typed service on top of it. Backends
//! are pluggable: an in-process map for development and tests, and Redis for
//! deployments where several gateway instances share state.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod redis;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found or has expired.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Expiration policy for a single cache entry.
///
/// An entry expires at the absolute deadline, or once it has not been read
/// for the sliding window, whichever comes first. Either may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheEntryOptions {
	pub absolute_expiration: Option<Duration>,
	pub sliding_expiration: Option<Duration>,
}

impl CacheEntryOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_absolute_expiration(mut self, ttl: Duration) -> Self {
		self.absolute_expiration = Some(ttl);
		self
	}

	/// Sets the sliding window. A zero window disables sliding expiry.
	pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
		self.sliding_expiration = (!window.is_zero()).then_some(window);
		self
	}
}

/// Trait defining the low-level interface for cache backends.
///
/// Plain get/set semantics: there is no compare-and-swap, so concurrent
/// writers of one key race and the last write wins.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key, refreshing its sliding window.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given expiration policy.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		options: &CacheEntryOptions,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a live key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level backend and provides convenient
/// methods for storing and retrieving typed data with JSON encoding.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Expiration policy applied by [`StorageService::store`].
	default_options: CacheEntryOptions,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self {
			backend,
			default_options: CacheEntryOptions::default(),
		}
	}

	/// Sets the expiration policy used when none is given explicitly.
	pub fn with_default_options(mut self, options: CacheEntryOptions) -> Self {
		self.default_options = options;
		self
	}

	pub fn default_options(&self) -> &CacheEntryOptions {
		&self.default_options
	}

	/// Stores a serializable value with an explicit expiration policy.
	///
	/// The namespace and id are combined to form a unique key.
	pub async fn store_with_options<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		options: &CacheEntryOptions,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, options)
			.await
	}

	/// Stores a serializable value under the default expiration policy.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let options = self.default_options;
		self.store_with_options(namespace, id, data, &options).await
	}

	/// Retrieves and deserializes a value from storage.
	///
	/// Bytes that no longer decode as `T` surface as
	/// [`StorageError::Serialization`].
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks whether a live value exists.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Sample {
		name: String,
		count: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_store_then_retrieve() {
		let storage = service();
		let sample = Sample {
			name: "a".to_string(),
			count: 3,
		};

		storage.store("samples", "1", &sample).await.unwrap();
		let loaded: Sample = storage.retrieve("samples", "1").await.unwrap();
		assert_eq!(loaded, sample);
		assert!(storage.exists("samples", "1").await.unwrap());
	}

	#[tokio::test]
	async fn test_namespaces_do_not_collide() {
		let storage = service();
		let sample = Sample {
			name: "a".to_string(),
			count: 3,
		};

		storage.store("left", "1", &sample).await.unwrap();
		let missing = storage.retrieve::<Sample>("right", "1").await;
		assert!(matches!(missing, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_corrupt_value_is_a_serialization_error() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("samples:1", b"not json".to_vec(), &CacheEntryOptions::default())
			.await
			.unwrap();
		let storage = StorageService::new(Box::new(backend));

		let result = storage.retrieve::<Sample>("samples", "1").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}

	#[tokio::test]
	async fn test_remove_deletes_value() {
		let storage = service();
		storage.store("samples", "1", &1u32).await.unwrap();
		storage.remove("samples", "1").await.unwrap();
		assert!(!storage.exists("samples", "1").await.unwrap());
	}
}
