//! Maps token endpoint failures onto the provider error taxonomy.
//!
//! Interaction codes embedded in the description win, then the structured OAuth `error`, then
//! hints in the description text, and finally the HTTP status. Only responses that reached the
//! token endpoint are classified here; transport failures are mapped by the backend directly.

// self
use crate::_prelude::*;

/// Grant that produced a token endpoint failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantKind {
	/// `client_credentials` (secret or certificate assertion).
	ClientCredentials,
	/// `refresh_token` redemption of a cached session.
	RefreshToken,
	/// `authorization_code` exchange after a prompt.
	AuthorizationCode,
}
impl GrantKind {
	/// Returns the `grant_type` form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ClientCredentials => "client_credentials",
			Self::RefreshToken => "refresh_token",
			Self::AuthorizationCode => "authorization_code",
		}
	}
}
impl Display for GrantKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// The presented credentials or grant were rejected.
	Rejected,
	/// The identity provider wants the user in the loop (MFA, consent, expired session).
	InteractionRequired,
	/// The user denied access.
	Cancelled,
	/// Temporary failure; retry later.
	Transient,
}

/// Primitive facts about a failed token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// Grant that failed.
	pub grant: GrantKind,
	/// HTTP status code, when a response arrived.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
}
impl TokenErrorContext {
	/// Creates an empty context for `grant`.
	pub fn new(grant: GrantKind) -> Self {
		Self { grant, http_status: None, oauth_error: None, error_description: None }
	}

	/// Adds the HTTP status.
	pub fn with_http_status(mut self, status: Option<u16>) -> Self {
		self.http_status = status;

		self
	}

	/// Adds the OAuth `error` field.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: Option<impl Into<String>>) -> Self {
		self.error_description = description.map(Into::into);

		self
	}

	/// Classifies the failure.
	pub fn classify(&self) -> TokenErrorKind {
		if self.error_description.as_deref().is_some_and(mentions_interaction_code) {
			return TokenErrorKind::InteractionRequired;
		}
		if let Some(kind) = self.oauth_error.as_deref().and_then(match_oauth_error) {
			return kind;
		}
		if let Some(kind) = self.error_description.as_deref().and_then(classify_text) {
			return kind;
		}

		classify_status(self.http_status)
	}

	/// Human-readable reason for error messages.
	pub fn reason(&self) -> String {
		match (self.oauth_error.as_deref(), self.error_description.as_deref()) {
			(Some(error), Some(description)) => format!("{error}: {}", first_line(description)),
			(Some(error), None) => error.to_owned(),
			(None, Some(description)) => first_line(description).to_owned(),
			(None, None) => match self.http_status {
				Some(status) => format!("{} grant failed with HTTP {status}", self.grant),
				None => format!("{} grant failed", self.grant),
			},
		}
	}
}

// Multi-factor, consent, and expired-session codes that only a prompt can resolve.
const INTERACTION_CODES: [&str; 5] =
	["AADSTS50058", "AADSTS50076", "AADSTS50078", "AADSTS50079", "AADSTS65001"];

fn mentions_interaction_code(description: &str) -> bool {
	INTERACTION_CODES.iter().any(|code| description.contains(code))
}

fn match_oauth_error(value: &str) -> Option<TokenErrorKind> {
	let value = value.to_ascii_lowercase();

	match value.as_str() {
		"invalid_client" | "unauthorized_client" | "invalid_grant" | "invalid_request"
		| "invalid_scope" | "unsupported_grant_type" => Some(TokenErrorKind::Rejected),
		"interaction_required" | "consent_required" | "login_required" =>
			Some(TokenErrorKind::InteractionRequired),
		"access_denied" => Some(TokenErrorKind::Cancelled),
		"temporarily_unavailable" | "server_error" | "slow_down" => Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_text(text: &str) -> Option<TokenErrorKind> {
	let lowered = text.to_ascii_lowercase();

	match lowered.as_str() {
		t if t.contains("interaction_required") || t.contains("consent_required") =>
			Some(TokenErrorKind::InteractionRequired),
		t if t.contains("invalid_grant") || t.contains("invalid_client") =>
			Some(TokenErrorKind::Rejected),
		t if t.contains("temporarily_unavailable") => Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400 | 401 | 403) => TokenErrorKind::Rejected,
		_ => TokenErrorKind::Transient,
	}
}

fn first_line(text: &str) -> &str {
	text.lines().next().unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn ctx(error: &str) -> TokenErrorContext {
		TokenErrorContext::new(GrantKind::ClientCredentials).with_oauth_error(error)
	}

	#[test]
	fn oauth_codes_map_to_categories() {
		assert_eq!(ctx("invalid_client").classify(), TokenErrorKind::Rejected);
		assert_eq!(ctx("INVALID_GRANT").classify(), TokenErrorKind::Rejected);
		assert_eq!(ctx("consent_required").classify(), TokenErrorKind::InteractionRequired);
		assert_eq!(ctx("access_denied").classify(), TokenErrorKind::Cancelled);
		assert_eq!(ctx("temporarily_unavailable").classify(), TokenErrorKind::Transient);
	}

	#[test]
	fn mfa_codes_override_invalid_grant() {
		let ctx = TokenErrorContext::new(GrantKind::RefreshToken)
			.with_oauth_error("invalid_grant")
			.with_error_description(Some(
				"AADSTS50076: Due to a configuration change you must use multi-factor \
				 authentication.\r\nTrace ID: abc",
			));

		assert_eq!(ctx.classify(), TokenErrorKind::InteractionRequired);
		assert!(ctx.reason().starts_with("invalid_grant: AADSTS50076"));
		assert!(!ctx.reason().contains("Trace ID"));
	}

	#[test]
	fn status_fallbacks() {
		let base = TokenErrorContext::new(GrantKind::AuthorizationCode);

		assert_eq!(base.clone().with_http_status(Some(401)).classify(), TokenErrorKind::Rejected);
		assert_eq!(base.clone().with_http_status(Some(429)).classify(), TokenErrorKind::Transient);
		assert_eq!(base.clone().with_http_status(Some(503)).classify(), TokenErrorKind::Transient);
		assert_eq!(
			base.with_http_status(Some(500)).reason(),
			"authorization_code grant failed with HTTP 500"
		);
	}
}
