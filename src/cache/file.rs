//! File-backed [`TokenCacheStore`] with atomic replacement and one writer per path.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
	sync::OnceLock,
};
// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, TokenCacheStore},
};

type WriterLock = Arc<AsyncMutex<()>>;

static WRITERS: OnceLock<Mutex<HashMap<PathBuf, WriterLock>>> = OnceLock::new();

/// Stores the session blob in a single file.
///
/// Saves go through a sibling temp file followed by a rename, so readers observe either the old or
/// the new blob. Every instance pointing at the same path shares one async writer lock, which
/// serializes saves within the process. The blob is written unencrypted.
#[derive(Clone)]
pub struct FileTokenCache {
	path: PathBuf,
	writer: WriterLock,
}
impl FileTokenCache {
	/// File extension used by [`default_location`](Self::default_location).
	pub const EXTENSION: &'static str = "tokencache";

	/// Opens a cache at `path`, creating parent directories as needed.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let writer = writer_for(&path);

		Ok(Self { path, writer })
	}

	/// Per-user cache location for `app`, e.g. `~/.local/share/<app>.tokencache` on Linux or
	/// `%LOCALAPPDATA%\<app>.tokencache` on Windows.
	pub fn default_location(app: &str) -> Option<PathBuf> {
		dirs::data_local_dir().map(|dir| dir.join(format!("{app}.{}", Self::EXTENSION)))
	}

	/// Path backing this cache.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_now(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| CacheError::Load {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		Ok(Some(bytes))
	}

	fn write_now(path: &Path, blob: &[u8]) -> Result<(), CacheError> {
		ensure_parent_exists(path)?;

		let tmp_path = tmp_path_for(path);

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Save {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(blob).map_err(|e| CacheError::Save {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Save {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, path).map_err(|e| CacheError::Save {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}
}
impl TokenCacheStore for FileTokenCache {
	fn load(&self) -> CacheFuture<'_, Option<Vec<u8>>> {
		Box::pin(async move { Self::read_now(&self.path) })
	}

	fn save<'a>(&'a self, blob: &'a [u8]) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let _guard = self.writer.lock().await;

			Self::write_now(&self.path, blob)
		})
	}
}
impl Debug for FileTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileTokenCache").field("path", &self.path).finish()
	}
}

fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| CacheError::Save {
			message: format!("Failed to create cache directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();

	name.push(".tmp");

	path.with_file_name(name)
}

fn writer_for(path: &Path) -> WriterLock {
	let key = path
		.parent()
		.filter(|p| !p.as_os_str().is_empty())
		.and_then(|parent| fs::canonicalize(parent).ok())
		.and_then(|parent| path.file_name().map(|name| parent.join(name)))
		.unwrap_or_else(|| path.to_path_buf());

	WRITERS.get_or_init(Default::default).lock().entry(key).or_default().clone()
}
