//! Immutable bearer credentials, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{Audience, DomainId, Secret},
};

/// Lifecycle status for a credential at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// The issued-at instant is in the future (clock skew between backend and caller).
	Pending,
	/// The credential is usable.
	Active,
	/// The credential reached its expiry instant.
	Expired,
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not come after the issue instant.
	#[error("Expiry must be later than the issued-at instant.")]
	ExpiryBeforeIssue,
}

/// Bearer-token material issued for one domain and audience.
///
/// Credentials are never mutated after issue; a refresh produces a new value.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	domain: DomainId,
	audience: Audience,
	token_type: String,
	access_token: Secret,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
}
impl Credential {
	const DEFAULT_TOKEN_TYPE: &'static str = "Bearer";

	/// Returns a builder for the provided domain and audience.
	pub fn builder(domain: DomainId, audience: Audience) -> CredentialBuilder {
		CredentialBuilder::new(domain, audience)
	}

	/// Identity domain that issued the credential.
	pub fn domain(&self) -> &DomainId {
		&self.domain
	}

	/// Audience the credential is valid for.
	pub fn audience(&self) -> &Audience {
		&self.audience
	}

	/// Token type reported by the backend (normally `Bearer`).
	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	/// Access token secret; callers must avoid logging it.
	pub fn access_token(&self) -> &Secret {
		&self.access_token
	}

	/// Issue instant.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Value for an HTTP `Authorization` header.
	pub fn authorization_header(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant < self.issued_at {
			return CredentialStatus::Pending;
		}
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}

		CredentialStatus::Active
	}

	/// Checks the status against the current UTC clock.
	pub fn status(&self) -> CredentialStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the credential is expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Returns `true` if the credential is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		matches!(self.status(), CredentialStatus::Expired)
	}

	/// Returns `true` when the credential expires within `window` of `instant`.
	pub fn expires_within(&self, window: Duration, instant: OffsetDateTime) -> bool {
		self.expires_at - instant <= window
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("domain", &self.domain)
			.field("audience", &self.audience)
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug)]
pub struct CredentialBuilder {
	domain: DomainId,
	audience: Audience,
	token_type: Option<String>,
	access_token: Option<Secret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	fn new(domain: DomainId, audience: Audience) -> Self {
		Self {
			domain,
			audience,
			token_type: None,
			access_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Overrides the token type (defaults to `Bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(Secret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(CredentialBuilderError::ExpiryBeforeIssue);
		}

		Ok(Credential {
			domain: self.domain,
			audience: self.audience,
			token_type: self.token_type.unwrap_or_else(|| Credential::DEFAULT_TOKEN_TYPE.into()),
			access_token,
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn domain() -> DomainId {
		DomainId::new("contoso.onmicrosoft.com").expect("Domain fixture should be valid.")
	}

	#[test]
	fn status_transitions_cover_all_states() {
		let credential = Credential::builder(domain(), Audience::management())
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Credential builder should succeed for status transitions.");

		assert_eq!(
			credential.status_at(macros::datetime!(2024-12-31 23:59 UTC)),
			CredentialStatus::Pending
		);
		assert_eq!(
			credential.status_at(macros::datetime!(2025-01-01 00:30 UTC)),
			CredentialStatus::Active
		);
		assert_eq!(
			credential.status_at(macros::datetime!(2025-01-01 01:00 UTC)),
			CredentialStatus::Expired
		);
		assert!(credential.expires_within(
			Duration::minutes(5),
			macros::datetime!(2025-01-01 00:56 UTC)
		));
	}

	#[test]
	fn builder_handles_relative_expiry_and_default_type() {
		let credential = Credential::builder(domain(), Audience::data_lake())
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Credential builder should support relative expiry calculations.");

		assert_eq!(credential.expires_at(), macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(credential.authorization_header(), "Bearer secret");
		assert_eq!(credential.audience(), &Audience::data_lake());
	}

	#[test]
	fn builder_rejects_missing_or_inverted_fields() {
		let missing = Credential::builder(domain(), Audience::graph())
			.expires_in(Duration::minutes(1))
			.build()
			.expect_err("Missing token must fail.");

		assert_eq!(missing, CredentialBuilderError::MissingAccessToken);

		let inverted = Credential::builder(domain(), Audience::graph())
			.access_token("token")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2024-01-01 00:00 UTC))
			.build()
			.expect_err("Expiry before issue must fail.");

		assert_eq!(inverted, CredentialBuilderError::ExpiryBeforeIssue);
	}

	#[test]
	fn debug_output_redacts_token() {
		let credential = Credential::builder(domain(), Audience::graph())
			.access_token("very-secret-token")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential fixture should build.");
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("very-secret-token"));
		assert!(rendered.contains("<redacted>"));
	}
}
