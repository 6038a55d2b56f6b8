//! Identity backend contract plus the shipped OAuth 2.0 implementation.
//!
//! [`CredentialProvider`](crate::provider::CredentialProvider) talks to one [`IdentityBackend`].
//! The backend decides how to prompt, how to redeem cached sessions, and what goes into the cache
//! blob; the provider only routes strategies and moves bytes between the store and
//! [`CacheHooks`].

pub mod classify;
pub mod oauth;
pub mod prompt;
pub mod session;
pub mod settings;

pub use classify::*;
pub use oauth::*;
pub use prompt::*;
pub use session::{AuthorizationSession, SessionSnapshot};
pub use settings::*;

// self
use crate::{
	_prelude::*,
	auth::{Audience, ClientCertificate, ClientId, Credential, DomainId, Secret},
	cache::CacheHooks,
	strategy::PromptBehavior,
};

/// Boxed future returned by [`IdentityBackend`] operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Validated target of a login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginRequest {
	/// Identity domain (tenant) to authenticate against.
	pub domain: DomainId,
	/// Resource the credential is requested for.
	pub audience: Audience,
}
impl LoginRequest {
	/// Creates a login request.
	pub fn new(domain: DomainId, audience: Audience) -> Self {
		Self { domain, audience }
	}
}

/// Service identity presented by a silent login.
#[derive(Clone, Debug)]
pub enum SilentIdentity {
	/// Application id plus shared secret.
	SecretKey {
		/// Application identifier.
		client_id: ClientId,
		/// Shared secret.
		secret: Secret,
	},
	/// Application id plus a loaded certificate.
	Certificate {
		/// Application identifier.
		client_id: ClientId,
		/// Certificate used to sign the client assertion.
		certificate: ClientCertificate,
	},
}
impl SilentIdentity {
	/// Application identifier of either variant.
	pub fn client_id(&self) -> &ClientId {
		match self {
			Self::SecretKey { client_id, .. } | Self::Certificate { client_id, .. } => client_id,
		}
	}
}

/// Identity backend consumed by the provider.
pub trait IdentityBackend
where
	Self: Send + Sync,
{
	/// Logs a user in interactively.
	///
	/// When `hooks` is present, the backend restores session state from
	/// [`CacheHooks::restored`] and records updated state through [`CacheHooks::persist`].
	fn login_interactive<'a>(
		&'a self,
		request: &'a LoginRequest,
		prompt: PromptBehavior,
		hooks: Option<&'a mut CacheHooks>,
	) -> BackendFuture<'a, Credential>;

	/// Logs a service identity in without user interaction.
	fn login_silent<'a>(
		&'a self,
		request: &'a LoginRequest,
		identity: &'a SilentIdentity,
	) -> BackendFuture<'a, Credential>;

	/// Logs a user in through the device-code flow.
	///
	/// The default reports [`Error::Unsupported`].
	fn login_device_code<'a>(&'a self, request: &'a LoginRequest) -> BackendFuture<'a, Credential> {
		let _ = request;

		Box::pin(async {
			Err(Error::Unsupported {
				operation: "Device code login",
				reason: "the identity backend does not implement the device code flow".into(),
			})
		})
	}
}
