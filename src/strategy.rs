//! Authentication strategies accepted by [`CredentialProvider::acquire`](crate::provider::CredentialProvider::acquire).

// self
use crate::{
	_prelude::*,
	auth::{CertificateSource, ClientId, Secret},
	cache::TokenCacheStore,
};

/// How aggressively an interactive login may show a prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptBehavior {
	/// Reuse restored session state when possible; prompt otherwise.
	#[default]
	Auto,
	/// Ignore restored session state and always prompt for credentials.
	Always,
	/// Never prompt; fail with [`Error::InteractionRequired`] when a prompt would be needed.
	Never,
	/// Prompt and ask the identity provider to refresh the existing session.
	RefreshSession,
	/// Prompt with an account picker.
	SelectAccount,
}
impl PromptBehavior {
	/// Whether restored session state may be redeemed before prompting.
	pub const fn reuses_session(self) -> bool {
		!matches!(self, Self::Always)
	}

	/// Whether the behavior permits showing a prompt at all.
	pub const fn may_prompt(self) -> bool {
		!matches!(self, Self::Never)
	}

	/// Value of the authorize endpoint `prompt` parameter, if any.
	pub const fn prompt_param(self) -> Option<&'static str> {
		match self {
			Self::Auto | Self::Never => None,
			Self::Always => Some("login"),
			Self::RefreshSession => Some("refresh_session"),
			Self::SelectAccount => Some("select_account"),
		}
	}
}

/// Stable label for each strategy, used in spans and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
	/// Interactive login without session persistence.
	InteractivePrompt,
	/// Interactive login wired to a token cache.
	InteractiveWithCache,
	/// Service identity with a shared secret.
	SecretKey,
	/// Service identity with a certificate-signed assertion.
	CertificateAssertion,
	/// Device-code login.
	DeviceCode,
}
impl StrategyKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InteractivePrompt => "interactive_prompt",
			Self::InteractiveWithCache => "interactive_with_cache",
			Self::SecretKey => "secret_key",
			Self::CertificateAssertion => "certificate_assertion",
			Self::DeviceCode => "device_code",
		}
	}
}
impl Display for StrategyKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Login strategy; each variant carries only what its flow needs.
#[derive(Clone)]
pub enum AuthStrategy {
	/// Interactive user login with no session persistence.
	InteractivePrompt {
		/// Prompt policy.
		prompt: PromptBehavior,
	},
	/// Interactive user login whose session state is restored from and persisted to `cache`.
	InteractiveWithCache {
		/// Prompt policy.
		prompt: PromptBehavior,
		/// Durable store for the backend's session blob.
		cache: Arc<dyn TokenCacheStore>,
	},
	/// Service identity authenticating with a shared secret.
	SecretKey {
		/// Application identifier.
		client_id: ClientId,
		/// Shared secret.
		secret: Secret,
	},
	/// Service identity authenticating with a certificate-signed assertion.
	CertificateAssertion {
		/// Application identifier.
		client_id: ClientId,
		/// Certificate bundle used to sign the assertion.
		certificate: CertificateSource,
	},
	/// Device-code login.
	DeviceCode,
}
impl AuthStrategy {
	/// Interactive login without a cache.
	pub fn interactive(prompt: PromptBehavior) -> Self {
		Self::InteractivePrompt { prompt }
	}

	/// Interactive login backed by a token cache.
	pub fn interactive_with_cache(prompt: PromptBehavior, cache: Arc<dyn TokenCacheStore>) -> Self {
		Self::InteractiveWithCache { prompt, cache }
	}

	/// Service identity with a shared secret.
	pub fn secret_key(client_id: ClientId, secret: impl Into<Secret>) -> Self {
		Self::SecretKey { client_id, secret: secret.into() }
	}

	/// Service identity with a certificate.
	pub fn certificate(client_id: ClientId, certificate: CertificateSource) -> Self {
		Self::CertificateAssertion { client_id, certificate }
	}

	/// Label for observability.
	pub fn kind(&self) -> StrategyKind {
		match self {
			Self::InteractivePrompt { .. } => StrategyKind::InteractivePrompt,
			Self::InteractiveWithCache { .. } => StrategyKind::InteractiveWithCache,
			Self::SecretKey { .. } => StrategyKind::SecretKey,
			Self::CertificateAssertion { .. } => StrategyKind::CertificateAssertion,
			Self::DeviceCode => StrategyKind::DeviceCode,
		}
	}
}
impl Debug for AuthStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::InteractivePrompt { prompt } =>
				f.debug_struct("InteractivePrompt").field("prompt", prompt).finish(),
			Self::InteractiveWithCache { prompt, .. } => f
				.debug_struct("InteractiveWithCache")
				.field("prompt", prompt)
				.field("cache", &"<store>")
				.finish(),
			Self::SecretKey { client_id, secret } => f
				.debug_struct("SecretKey")
				.field("client_id", client_id)
				.field("secret", secret)
				.finish(),
			Self::CertificateAssertion { client_id, certificate } => f
				.debug_struct("CertificateAssertion")
				.field("client_id", client_id)
				.field("certificate", certificate)
				.finish(),
			Self::DeviceCode => f.write_str("DeviceCode"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn prompt_behavior_flags() {
		assert!(PromptBehavior::Auto.reuses_session());
		assert!(!PromptBehavior::Always.reuses_session());
		assert!(!PromptBehavior::Never.may_prompt());
		assert_eq!(PromptBehavior::SelectAccount.prompt_param(), Some("select_account"));
		assert_eq!(PromptBehavior::Auto.prompt_param(), None);
	}

	#[test]
	fn debug_output_hides_secret() {
		let strategy = AuthStrategy::secret_key(
			ClientId::new("svc").expect("Client fixture should be valid."),
			"hunter2",
		);

		assert_eq!(strategy.kind(), StrategyKind::SecretKey);
		assert!(!format!("{strategy:?}").contains("hunter2"));
	}

	#[test]
	fn prompt_behavior_deserializes_snake_case() {
		let behavior: PromptBehavior = serde_json::from_str("\"refresh_session\"")
			.expect("Prompt behavior should deserialize.");

		assert_eq!(behavior, PromptBehavior::RefreshSession);
	}
}
