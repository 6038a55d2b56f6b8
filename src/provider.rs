//! Strategy router that turns `(domain, audience, strategy)` into a [`Credential`].

// self
use crate::{
	_prelude::*,
	auth::{Audience, Credential, DomainId},
	backend::{IdentityBackend, LoginRequest, SilentIdentity},
	cache::{CacheHooks, TokenCacheStore},
	obs::{self, AcquireOutcome, AcquireSpan},
	strategy::{AuthStrategy, PromptBehavior},
};

/// Acquires credentials from one [`IdentityBackend`].
///
/// Each call validates its arguments before touching the backend or a cache, routes to exactly
/// one backend login, and performs no retries. A provider carries no per-call state, so one
/// instance may serve concurrent acquisitions.
#[derive(Clone)]
pub struct CredentialProvider {
	backend: Arc<dyn IdentityBackend>,
}
impl CredentialProvider {
	/// Creates a provider over `backend`.
	pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
		Self { backend }
	}

	/// Backend used for logins.
	pub fn backend(&self) -> &Arc<dyn IdentityBackend> {
		&self.backend
	}

	/// Acquires a credential for `audience` in `domain` using `strategy`.
	///
	/// # Cache behavior
	///
	/// [`AuthStrategy::InteractiveWithCache`] loads the cache once before the login and saves it
	/// at most once afterwards: only when the login succeeded and the backend persisted state
	/// through [`CacheHooks`]. A stored blob is never replaced by nothing. A failed load is logged and the login proceeds without
	/// cached state; a failed save is returned as [`Error::CacheIo`] even though the login itself
	/// succeeded. No other strategy touches a cache.
	pub async fn acquire(
		&self,
		domain: &str,
		audience: &str,
		strategy: &AuthStrategy,
	) -> Result<Credential> {
		let kind = strategy.kind();
		let span = AcquireSpan::new(kind, "acquire");

		obs::record_acquire_outcome(kind, AcquireOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = LoginRequest::new(DomainId::new(domain)?, Audience::parse(audience)?);

				self.route(&request, strategy).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_acquire_outcome(kind, AcquireOutcome::Success),
			Err(_) => obs::record_acquire_outcome(kind, AcquireOutcome::Failure),
		}

		result
	}

	async fn route(&self, request: &LoginRequest, strategy: &AuthStrategy) -> Result<Credential> {
		match strategy {
			AuthStrategy::InteractivePrompt { prompt } =>
				self.backend.login_interactive(request, *prompt, None).await,
			AuthStrategy::InteractiveWithCache { prompt, cache } =>
				self.interactive_with_cache(request, *prompt, cache.as_ref()).await,
			AuthStrategy::SecretKey { client_id, secret } => {
				let identity = SilentIdentity::SecretKey {
					client_id: client_id.clone(),
					secret: secret.clone(),
				};

				self.backend.login_silent(request, &identity).await
			},
			AuthStrategy::CertificateAssertion { client_id, certificate } => {
				let identity = SilentIdentity::Certificate {
					client_id: client_id.clone(),
					certificate: certificate.load()?,
				};

				self.backend.login_silent(request, &identity).await
			},
			AuthStrategy::DeviceCode => self.backend.login_device_code(request).await,
		}
	}

	async fn interactive_with_cache(
		&self,
		request: &LoginRequest,
		prompt: PromptBehavior,
		cache: &dyn TokenCacheStore,
	) -> Result<Credential> {
		let restored = cache.load().await.unwrap_or_else(|e| {
			obs::cache_load_failed(&e);

			None
		});
		let mut hooks = CacheHooks::new(restored);
		let credential = self.backend.login_interactive(request, prompt, Some(&mut hooks)).await?;

		if let Some(blob) = hooks.into_pending() {
			cache.save(&blob).await?;
		}

		Ok(credential)
	}
}
impl Debug for CredentialProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialProvider(..)")
	}
}
