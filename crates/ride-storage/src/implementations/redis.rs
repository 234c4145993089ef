//! Redis cache backend.
//!
//! Each entry is a hash with three fields: the payload under `data`, the
//! absolute deadline as unix milliseconds under `absexp` and the sliding
//! window in milliseconds under `sldexp`. A missing policy is stored as `-1`.
//! The key's own TTL is kept at whichever limit is nearer and is pushed back
//! on every read that finds a sliding window.

use crate::{CacheEntryOptions, StorageError, StorageInterface};
use async_trait::async_trait;
use bb8_redis::{bb8::Pool, redis, RedisConnectionManager};
use chrono::Utc;
use tracing::{debug, instrument};

const DATA_FIELD: &str = "data";
const ABSOLUTE_FIELD: &str = "absexp";
const SLIDING_FIELD: &str = "sldexp";
const NOT_PRESENT: i64 = -1;

/// Redis-backed implementation of [`StorageInterface`].
pub struct RedisStorage {
	pool: Pool<RedisConnectionManager>,
	key_prefix: String,
}

impl RedisStorage {
	/// Creates a pooled backend. Connections are opened lazily.
	pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, StorageError> {
		let manager = RedisConnectionManager::new(url)
			.map_err(|e| StorageError::Backend(format!("Invalid redis url: {}", e)))?;
		let pool = Pool::builder().build_unchecked(manager);
		Ok(Self {
			pool,
			key_prefix: key_prefix.into(),
		})
	}

	fn full_key(&self, key: &str) -> String {
		format!("{}{}", self.key_prefix, key)
	}

	async fn connection(
		&self,
	) -> Result<bb8_redis::bb8::PooledConnection<'_, RedisConnectionManager>, StorageError> {
		self.pool
			.get()
			.await
			.map_err(|e| StorageError::Backend(format!("Redis pool: {}", e)))
	}
}

fn backend_error(e: redis::RedisError) -> StorageError {
	StorageError::Backend(e.to_string())
}

fn as_millis(duration: Option<std::time::Duration>) -> Option<i64> {
	duration.map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Milliseconds until a key with the given policy should expire.
///
/// Returns `None` when the entry has no expiration at all. The result is never
/// negative; a deadline already in the past yields zero.
pub fn expiry_ms(now_ms: i64, absolute_deadline_ms: Option<i64>, sliding_ms: Option<i64>) -> Option<i64> {
	let remaining = absolute_deadline_ms.map(|deadline| (deadline - now_ms).max(0));
	match (remaining, sliding_ms) {
		(Some(remaining), Some(sliding)) => Some(remaining.min(sliding)),
		(Some(remaining), None) => Some(remaining),
		(None, Some(sliding)) => Some(sliding),
		(None, None) => None,
	}
}

fn stored_policy(value: Option<i64>) -> Option<i64> {
	value.filter(|v| *v != NOT_PRESENT)
}

#[async_trait]
impl StorageInterface for RedisStorage {
	#[instrument(skip(self))]
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let key = self.full_key(key);
		let mut conn = self.connection().await?;

		let (data, absolute, sliding): (Option<Vec<u8>>, Option<i64>, Option<i64>) =
			redis::cmd("HMGET")
				.arg(&key)
				.arg(DATA_FIELD)
				.arg(ABSOLUTE_FIELD)
				.arg(SLIDING_FIELD)
				.query_async(&mut *conn)
				.await
				.map_err(backend_error)?;

		let data = data.ok_or(StorageError::NotFound)?;

		let sliding = stored_policy(sliding);
		if sliding.is_some() {
			let now_ms = Utc::now().timestamp_millis();
			if let Some(ttl) = expiry_ms(now_ms, stored_policy(absolute), sliding) {
				if ttl == 0 {
					return Err(StorageError::NotFound);
				}
				let _: i64 = redis::cmd("PEXPIRE")
					.arg(&key)
					.arg(ttl)
					.query_async(&mut *conn)
					.await
					.map_err(backend_error)?;
			}
		}

		Ok(data)
	}

	#[instrument(skip(self, value))]
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		options: &CacheEntryOptions,
	) -> Result<(), StorageError> {
		let key = self.full_key(key);
		let now_ms = Utc::now().timestamp_millis();
		let absolute = as_millis(options.absolute_expiration).map(|ttl| now_ms.saturating_add(ttl));
		let sliding = as_millis(options.sliding_expiration);

		let mut pipe = redis::pipe();
		pipe.atomic()
			.cmd("DEL")
			.arg(&key)
			.ignore()
			.cmd("HSET")
			.arg(&key)
			.arg(DATA_FIELD)
			.arg(value)
			.arg(ABSOLUTE_FIELD)
			.arg(absolute.unwrap_or(NOT_PRESENT))
			.arg(SLIDING_FIELD)
			.arg(sliding.unwrap_or(NOT_PRESENT))
			.ignore();
		if let Some(ttl) = expiry_ms(now_ms, absolute, sliding) {
			pipe.cmd("PEXPIRE").arg(&key).arg(ttl.max(1)).ignore();
		}

		let mut conn = self.connection().await?;
		let _: () = pipe.query_async(&mut *conn).await.map_err(backend_error)?;
		debug!(key = %key, "Stored cache entry");
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut conn = self.connection().await?;
		let _: i64 = redis::cmd("DEL")
			.arg(self.full_key(key))
			.query_async(&mut *conn)
			.await
			.map_err(backend_error)?;
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let mut conn = self.connection().await?;
		let found: bool = redis::cmd("EXISTS")
			.arg(self.full_key(key))
			.query_async(&mut *conn)
			.await
			.map_err(backend_error)?;
		Ok(found)
	}
}

/// Factory function to create a Redis backend from configuration.
///
/// Configuration parameters:
/// - `url`: connection string, e.g. `redis://127.0.0.1:6379` (required)
/// - `key_prefix`: prepended to every key (default: "ride-gateway:")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Backend("Redis backend requires 'url'".to_string()))?;
	let key_prefix = config
		.get("key_prefix")
		.and_then(|v| v.as_str())
		.unwrap_or("ride-gateway:");

	Ok(Box::new(RedisStorage::new(url, key_prefix)?))
}
