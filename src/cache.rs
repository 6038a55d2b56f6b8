//! Token cache contracts, the hook pair handed to backends, and built-in stores.
//!
//! A [`TokenCacheStore`] persists one opaque blob; the identity backend owns whatever keying lives
//! inside it. The provider reads the blob once before an interactive login and writes it at most
//! once afterwards, only when the login succeeded and the backend persisted new state.

pub mod file;
pub mod memory;

pub use file::FileTokenCache;
pub use memory::MemoryTokenCache;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenCacheStore`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Durable storage for a backend's serialized session state.
///
/// The built-in stores write plain bytes without encryption; callers holding long-lived refresh
/// tokens should supply a store backed by an OS keychain or similar.
pub trait TokenCacheStore
where
	Self: Send + Sync,
{
	/// Returns the stored blob, or `None` when nothing has been saved yet.
	fn load(&self) -> CacheFuture<'_, Option<Vec<u8>>>;

	/// Replaces the stored blob.
	fn save<'a>(&'a self, blob: &'a [u8]) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Reading the stored blob failed.
	#[error("Token cache load failed: {message}.")]
	Load {
		/// Human-readable error payload.
		message: String,
	},
	/// Writing the blob failed.
	#[error("Token cache save failed: {message}.")]
	Save {
		/// Human-readable error payload.
		message: String,
	},
}

/// Read-before/write-after hook pair passed to interactive logins that opted into caching.
///
/// The provider fills [`restored`](Self::restored) from the store before the login; the backend
/// records updated state through [`persist`](Self::persist). Nothing touches the store until the
/// login has succeeded.
#[derive(Clone, Default)]
pub struct CacheHooks {
	restored: Option<Vec<u8>>,
	pending: Option<Vec<u8>>,
}
impl CacheHooks {
	/// Creates hooks seeded with the blob loaded from the store.
	pub fn new(restored: Option<Vec<u8>>) -> Self {
		Self { restored, pending: None }
	}

	/// Session state restored from the store, if any.
	pub fn restored(&self) -> Option<&[u8]> {
		self.restored.as_deref()
	}

	/// Records session state to be written once the login succeeds.
	pub fn persist(&mut self, blob: impl Into<Vec<u8>>) {
		self.pending = Some(blob.into());
	}

	/// State recorded through [`persist`](Self::persist), if any.
	pub fn pending(&self) -> Option<&[u8]> {
		self.pending.as_deref()
	}

	/// Consumes the hooks, returning the state recorded through [`persist`](Self::persist).
	pub fn into_pending(self) -> Option<Vec<u8>> {
		self.pending
	}
}
impl Debug for CacheHooks {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CacheHooks")
			.field("restored_len", &self.restored.as_ref().map(Vec::len))
			.field("pending_len", &self.pending.as_ref().map(Vec::len))
			.finish()
	}
}
