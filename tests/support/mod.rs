//! Scripted backend and counting cache shared by provider tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use credential_broker::{
	auth::Credential,
	backend::{BackendFuture, IdentityBackend, LoginRequest, SilentIdentity},
	cache::{CacheError, CacheFuture, CacheHooks, MemoryTokenCache, TokenCacheStore},
	error::Error,
	strategy::PromptBehavior,
};
use parking_lot::Mutex;
use time::Duration;

/// Backend call observed by [`ScriptedBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
	Interactive { prompt: PromptBehavior, hooks: bool, restored: Option<Vec<u8>> },
	Silent { client_id: String, certificate: bool },
	DeviceCode,
}

/// How the scripted backend answers logins.
#[derive(Clone, Copy, Debug)]
pub enum Script {
	Succeed,
	Reject,
	Cancel,
}

/// Backend that records calls and answers according to a [`Script`].
#[derive(Debug)]
pub struct ScriptedBackend {
	script: Script,
	persist: Option<Vec<u8>>,
	calls: Mutex<Vec<Call>>,
}
impl ScriptedBackend {
	pub fn new(script: Script) -> Arc<Self> {
		Arc::new(Self { script, persist: None, calls: Mutex::new(Vec::new()) })
	}

	pub fn persisting(script: Script, blob: &[u8]) -> Arc<Self> {
		Arc::new(Self { script, persist: Some(blob.to_vec()), calls: Mutex::new(Vec::new()) })
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	fn answer(&self, request: &LoginRequest) -> Result<Credential, Error> {
		match self.script {
			Script::Succeed => Ok(Credential::builder(
				request.domain.clone(),
				request.audience.clone(),
			)
			.access_token(format!("token-for-{}", request.audience))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Scripted credential should build.")),
			Script::Reject =>
				Err(Error::AuthenticationFailed { reason: "invalid_client: bad secret".into() }),
			Script::Cancel => Err(Error::UserCancelled),
		}
	}
}
impl IdentityBackend for ScriptedBackend {
	fn login_interactive<'a>(
		&'a self,
		request: &'a LoginRequest,
		prompt: PromptBehavior,
		hooks: Option<&'a mut CacheHooks>,
	) -> BackendFuture<'a, Credential> {
		Box::pin(async move {
			let restored = hooks.as_ref().and_then(|hooks| hooks.restored()).map(<[u8]>::to_vec);

			self.calls.lock().push(Call::Interactive {
				prompt,
				hooks: hooks.is_some(),
				restored,
			});

			let credential = self.answer(request)?;

			if let (Some(hooks), Some(blob)) = (hooks, self.persist.as_ref()) {
				hooks.persist(blob.clone());
			}

			Ok(credential)
		})
	}

	fn login_silent<'a>(
		&'a self,
		request: &'a LoginRequest,
		identity: &'a SilentIdentity,
	) -> BackendFuture<'a, Credential> {
		Box::pin(async move {
			self.calls.lock().push(Call::Silent {
				client_id: identity.client_id().to_string(),
				certificate: matches!(identity, SilentIdentity::Certificate { .. }),
			});

			self.answer(request)
		})
	}
}

/// Cache wrapper counting loads and saves, optionally failing either.
#[derive(Debug, Default)]
pub struct CountingCache {
	pub inner: MemoryTokenCache,
	loads: AtomicUsize,
	saves: AtomicUsize,
	fail_load: bool,
	fail_save: bool,
}
impl CountingCache {
	pub fn new(inner: MemoryTokenCache) -> Arc<Self> {
		Arc::new(Self { inner, ..Default::default() })
	}

	pub fn failing_load(inner: MemoryTokenCache) -> Arc<Self> {
		Arc::new(Self { inner, fail_load: true, ..Default::default() })
	}

	pub fn failing_save() -> Arc<Self> {
		Arc::new(Self { fail_save: true, ..Default::default() })
	}

	pub fn loads(&self) -> usize {
		self.loads.load(Ordering::SeqCst)
	}

	pub fn saves(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}
}
impl TokenCacheStore for CountingCache {
	fn load(&self) -> CacheFuture<'_, Option<Vec<u8>>> {
		Box::pin(async move {
			self.loads.fetch_add(1, Ordering::SeqCst);

			if self.fail_load {
				return Err(CacheError::Load { message: "permission denied".into() });
			}

			self.inner.load().await
		})
	}

	fn save<'a>(&'a self, blob: &'a [u8]) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.saves.fetch_add(1, Ordering::SeqCst);

			if self.fail_save {
				return Err(CacheError::Save { message: "disk full".into() });
			}

			self.inner.save(blob).await
		})
	}
}
