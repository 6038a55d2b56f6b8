//! Thread-safe in-memory [`TokenCacheStore`] for tests and short-lived tools.

// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, TokenCacheStore},
};

type Slot = Arc<RwLock<Option<Vec<u8>>>>;

/// Keeps the session blob in-process; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenCache(Slot);
impl MemoryTokenCache {
	/// Creates a cache pre-populated with `blob`.
	pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
		Self(Arc::new(RwLock::new(Some(blob.into()))))
	}

	/// Returns a copy of the current blob without going through the async contract.
	pub fn snapshot(&self) -> Option<Vec<u8>> {
		self.0.read().clone()
	}

	fn save_now(slot: &Slot, blob: &[u8]) {
		*slot.write() = Some(blob.to_vec());
	}
}
impl TokenCacheStore for MemoryTokenCache {
	fn load(&self) -> CacheFuture<'_, Option<Vec<u8>>> {
		Box::pin(async move { Ok(self.snapshot()) })
	}

	fn save<'a>(&'a self, blob: &'a [u8]) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			Self::save_now(&self.0, blob);

			Ok(())
		})
	}
}
