//! Keyed in-memory cache with per-entry expiry checked on read.
//!
//! Owned by the specific handler that needs it, not shared global state, so
//! invalidation stays local and testable.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
	ttl: Duration,
	entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			entries: Mutex::new(HashMap::new()),
		}
	}

	/// Returns the cached value if it has not outlived the TTL; stale
	/// entries are dropped on the spot.
	pub fn get(&self, key: &K) -> Option<V> {
		let mut entries = self.entries.lock().expect("cache lock poisoned");
		match entries.get(key) {
			Some((inserted_at, value)) if inserted_at.elapsed() < self.ttl => Some(value.clone()),
			Some(_) => {
				entries.remove(key);
				None
			}
			None => None,
		}
	}

	pub fn insert(&self, key: K, value: V) {
		let mut entries = self.entries.lock().expect("cache lock poisoned");
		entries.insert(key, (Instant::now(), value));
	}
}
