//! Attaching credentials to outbound requests.

// self
use crate::{_prelude::*, auth::Credential};

/// Attaches a [`Credential`] to an outbound request of any HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes `request` and returns it carrying authorization derived from `credential`.
	fn attach_credential(&self, request: Request, credential: &Credential)
	-> Result<Request, Error>;
}

/// Errors raised by [`BearerSigner`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SignerError {
	/// The credential is expired, or expires within the signer's skew window.
	#[error("Credential for {audience} expired at {expires_at}.")]
	Expired {
		/// Audience of the rejected credential.
		audience: String,
		/// Expiry instant of the rejected credential.
		expires_at: OffsetDateTime,
	},
}

/// Sets the `Authorization` header from a credential, refusing stale credentials.
#[derive(Clone, Copy, Debug)]
pub struct BearerSigner {
	skew: Duration,
}
impl BearerSigner {
	/// Default clock-skew allowance.
	pub const DEFAULT_SKEW: Duration = Duration::seconds(30);

	/// Signer that treats credentials expiring within `skew` as expired.
	pub fn with_skew(skew: Duration) -> Self {
		Self { skew: if skew.is_negative() { Duration::ZERO } else { skew } }
	}

	/// Returns the header value, or an error if the credential is too close to expiry.
	pub fn header_value(
		&self,
		credential: &Credential,
		now: OffsetDateTime,
	) -> Result<String, SignerError> {
		if credential.is_expired_at(now) || credential.expires_within(self.skew, now) {
			return Err(SignerError::Expired {
				audience: credential.audience().to_string(),
				expires_at: credential.expires_at(),
			});
		}

		Ok(credential.authorization_header())
	}
}
impl Default for BearerSigner {
	fn default() -> Self {
		Self::with_skew(Self::DEFAULT_SKEW)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, SignerError> for BearerSigner {
	fn attach_credential(
		&self,
		request: reqwest::RequestBuilder,
		credential: &Credential,
	) -> Result<reqwest::RequestBuilder, SignerError> {
		let value = self.header_value(credential, OffsetDateTime::now_utc())?;

		Ok(request.header(reqwest::header::AUTHORIZATION, value))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{Audience, DomainId};

	fn credential() -> Credential {
		Credential::builder(
			DomainId::new("contoso.onmicrosoft.com").expect("Domain fixture should be valid."),
			Audience::management(),
		)
		.access_token("signed")
		.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
		.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
		.build()
		.expect("Credential fixture should build.")
	}

	#[test]
	fn header_value_respects_skew() {
		let signer = BearerSigner::default();

		assert_eq!(
			signer
				.header_value(&credential(), macros::datetime!(2025-01-01 00:10 UTC))
				.expect("Fresh credential should sign."),
			"Bearer signed"
		);
		assert!(matches!(
			signer.header_value(&credential(), macros::datetime!(2025-01-01 00:59:45 UTC)),
			Err(SignerError::Expired { .. })
		));
		assert!(
			BearerSigner::with_skew(Duration::ZERO)
				.header_value(&credential(), macros::datetime!(2025-01-01 00:59:45 UTC))
				.is_ok()
		);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_builder_rejects_expired_credentials() {
		let request = ReqwestClient::new().get("https://management.azure.com/subscriptions");
		let err = BearerSigner::default()
			.attach_credential(request, &credential())
			.expect_err("Credential fixture expired in 2025.");

		assert!(err.to_string().contains("management.core.windows.net"));
	}
}
