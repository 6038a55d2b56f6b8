//! Provider-level error types shared across strategies, backends, and cache stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by [`CredentialProvider::acquire`](crate::provider::CredentialProvider::acquire)
/// and every identity backend.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Domain, audience, or client identifier failed validation.
	#[error(transparent)]
	InvalidArgument(#[from] InvalidArgumentError),
	/// Certificate material could not be read or parsed.
	#[error(transparent)]
	InvalidCertificate(#[from] crate::auth::CertificateError),
	/// Token cache load or save failed.
	#[error("{0}")]
	CacheIo(
		#[from]
		#[source]
		crate::cache::CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The identity backend rejected the presented credentials.
	#[error("Authentication failed: {reason}.")]
	AuthenticationFailed {
		/// Backend-supplied reason string.
		reason: String,
	},
	/// A prompt is required but the prompt behavior forbids showing one.
	#[error("User interaction is required: {reason}.")]
	InteractionRequired {
		/// Backend-supplied reason string.
		reason: String,
	},
	/// The user dismissed the interactive prompt or denied consent.
	#[error("The user cancelled the interactive login.")]
	UserCancelled,
	/// The backend does not implement the requested login mode.
	#[error("{operation} is not supported: {reason}.")]
	Unsupported {
		/// Login mode label.
		operation: &'static str,
		/// Why the mode is unavailable.
		reason: String,
	},
}
impl From<crate::auth::IdentifierError> for Error {
	fn from(e: crate::auth::IdentifierError) -> Self {
		InvalidArgumentError::from(e).into()
	}
}
impl From<crate::auth::AudienceError> for Error {
	fn from(e: crate::auth::AudienceError) -> Self {
		InvalidArgumentError::from(e).into()
	}
}

/// Argument validation failures surfaced as [`Error::InvalidArgument`].
#[derive(Debug, ThisError)]
pub enum InvalidArgumentError {
	/// Domain or client identifier is malformed.
	#[error("Invalid identifier: {0}")]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Audience URI is malformed.
	#[error("Invalid audience: {0}")]
	Audience(#[from] crate::auth::AudienceError),
}

/// Configuration and response-shape failures raised by backends.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Authority settings are invalid.
	#[error(transparent)]
	Settings(#[from] crate::backend::SettingsError),
	/// An endpoint derived from the authority settings cannot be parsed.
	#[error("Derived endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Credential builder validation failed.
	#[error("Unable to build credential.")]
	CredentialBuild(#[from] crate::auth::CredentialBuilderError),
	/// Session snapshot could not be encoded.
	#[error("Session snapshot could not be encoded.")]
	SessionEncode(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{Audience, DomainId};

	#[test]
	fn argument_errors_collapse_into_invalid_argument() {
		let domain_err: Error =
			DomainId::new("").expect_err("Empty domain must be rejected.").into();
		let audience_err: Error =
			Audience::parse("  ").expect_err("Blank audience must be rejected.").into();

		assert!(matches!(domain_err, Error::InvalidArgument(InvalidArgumentError::Identifier(_))));
		assert!(matches!(audience_err, Error::InvalidArgument(InvalidArgumentError::Audience(_))));
		assert!(domain_err.to_string().contains("cannot be empty"));
	}

	#[test]
	fn unsupported_message_names_operation() {
		let err = Error::Unsupported {
			operation: "Device code login",
			reason: "the backend has no device authorization endpoint".into(),
		};

		assert_eq!(
			err.to_string(),
			"Device code login is not supported: the backend has no device authorization endpoint."
		);
	}
}
