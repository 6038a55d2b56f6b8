//! Interactive session state: the persisted snapshot and the per-prompt PKCE handshake.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, DomainId, Secret},
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Serialized session state kept in a token cache.
///
/// Refresh tokens are keyed by domain and client id; one refresh token redeems access tokens for
/// any audience in that domain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
	#[serde(default)]
	sessions: BTreeMap<String, StoredSession>,
}
impl SessionSnapshot {
	/// Decodes a snapshot, reporting the JSON path of the first malformed field.
	pub fn decode(bytes: &[u8]) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Encodes the snapshot as JSON.
	pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}

	/// Refresh token stored for `domain` and `client_id`.
	pub fn refresh_token(&self, domain: &DomainId, client_id: &ClientId) -> Option<&Secret> {
		self.sessions.get(&Self::key(domain, client_id)).map(|session| &session.refresh_token)
	}

	/// Stores (or replaces) the refresh token for `domain` and `client_id`.
	pub fn remember(
		&mut self,
		domain: &DomainId,
		client_id: &ClientId,
		refresh_token: Secret,
		now: OffsetDateTime,
	) {
		self.sessions
			.insert(Self::key(domain, client_id), StoredSession { refresh_token, updated_at: now });
	}

	/// Drops the refresh token for `domain` and `client_id`; returns whether one existed.
	pub fn forget(&mut self, domain: &DomainId, client_id: &ClientId) -> bool {
		self.sessions.remove(&Self::key(domain, client_id)).is_some()
	}

	/// Number of stored sessions.
	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	/// Returns `true` when no session is stored.
	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	fn key(domain: &DomainId, client_id: &ClientId) -> String {
		format!("{}|{client_id}", domain.to_ascii_lowercase())
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct StoredSession {
	refresh_token: Secret,
	updated_at: OffsetDateTime,
}

/// State + PKCE handshake for one authorization prompt.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state that must round-trip through the redirect.
	pub state: String,
	/// Redirect URI sent with the request.
	pub redirect_uri: Url,
	/// Authorize URL to show the user.
	pub authorize_url: Url,
	pkce_verifier: String,
}
impl AuthorizationSession {
	/// Generates state + PKCE and builds the authorize URL.
	pub fn start(
		authorize_endpoint: Url,
		client_id: &ClientId,
		redirect_uri: Url,
		scope: &str,
		prompt: Option<&str>,
	) -> Self {
		let state = random_string(STATE_LEN);
		let pkce_verifier = random_string(PKCE_VERIFIER_LEN);
		let mut authorize_url = authorize_endpoint;

		{
			let mut pairs = authorize_url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", client_id);
			pairs.append_pair("redirect_uri", redirect_uri.as_str());
			pairs.append_pair("scope", scope);
			pairs.append_pair("state", &state);
			pairs.append_pair("code_challenge", &pkce_challenge(&pkce_verifier));
			pairs.append_pair("code_challenge_method", "S256");

			if let Some(prompt) = prompt {
				pairs.append_pair("prompt", prompt);
			}
		}

		Self { state, redirect_uri, authorize_url, pkce_verifier }
	}

	/// PKCE verifier to send with the code exchange.
	pub fn pkce_verifier(&self) -> &str {
		&self.pkce_verifier
	}

	/// Extracts the authorization code from the redirect URL.
	///
	/// `access_denied` means the user declined and maps to [`Error::UserCancelled`]; other
	/// callback errors, a missing code, or a state mismatch fail authentication.
	pub fn resolve_callback(&self, redirected: &Url) -> Result<String> {
		let mut code = None;
		let mut state = None;
		let mut error = None;
		let mut description = None;

		for (key, value) in redirected.query_pairs() {
			match key.as_ref() {
				"code" => code = Some(value.into_owned()),
				"state" => state = Some(value.into_owned()),
				"error" => error = Some(value.into_owned()),
				"error_description" => description = Some(value.into_owned()),
				_ => {},
			}
		}

		if let Some(error) = error {
			if error == "access_denied" {
				return Err(Error::UserCancelled);
			}

			let reason = match description {
				Some(description) => format!("{error}: {description}"),
				None => error,
			};

			return Err(Error::AuthenticationFailed { reason });
		}
		if state.as_deref() != Some(self.state.as_str()) {
			return Err(Error::AuthenticationFailed { reason: "authorization state mismatch".into() });
		}

		code.filter(|code| !code.is_empty()).ok_or_else(|| Error::AuthenticationFailed {
			reason: "authorization redirect carried no code".into(),
		})
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("pkce_verifier", &"<redacted>")
			.finish()
	}
}

/// Random alphanumeric string; also used for assertion `jti` values.
pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn domain() -> DomainId {
		DomainId::new("Contoso.onmicrosoft.com").expect("Domain fixture should be valid.")
	}

	fn client() -> ClientId {
		ClientId::new("public-client").expect("Client fixture should be valid.")
	}

	fn session() -> AuthorizationSession {
		AuthorizationSession::start(
			Url::parse("https://login.example.com/contoso/oauth2/v2.0/authorize")
				.expect("Authorize endpoint fixture should parse."),
			&client(),
			Url::parse("http://localhost/callback").expect("Redirect fixture should parse."),
			"https://graph.windows.net//.default offline_access",
			Some("select_account"),
		)
	}

	#[test]
	fn authorize_url_carries_pkce_and_prompt() {
		let session = session();
		let pairs: BTreeMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("state"), Some(&session.state));
		assert_eq!(pairs.get("code_challenge_method").map(String::as_str), Some("S256"));
		assert_eq!(
			pairs.get("code_challenge"),
			Some(&pkce_challenge(session.pkce_verifier()))
		);
		assert_eq!(pairs.get("prompt").map(String::as_str), Some("select_account"));
		assert_eq!(session.pkce_verifier().len(), PKCE_VERIFIER_LEN);
		assert!(!format!("{session:?}").contains(session.pkce_verifier()));
	}

	#[test]
	fn callback_resolution_checks_state_and_errors() {
		let session = session();
		let ok = Url::parse(&format!("http://localhost/callback?code=abc&state={}", session.state))
			.expect("Callback fixture should parse.");

		assert_eq!(session.resolve_callback(&ok).expect("Code should resolve."), "abc");

		let forged = Url::parse("http://localhost/callback?code=abc&state=forged")
			.expect("Callback fixture should parse.");

		assert!(matches!(
			session.resolve_callback(&forged),
			Err(Error::AuthenticationFailed { .. })
		));

		let denied = Url::parse("http://localhost/callback?error=access_denied")
			.expect("Callback fixture should parse.");

		assert!(matches!(session.resolve_callback(&denied), Err(Error::UserCancelled)));

		let failed =
			Url::parse("http://localhost/callback?error=server_error&error_description=boom")
				.expect("Callback fixture should parse.");

		assert!(matches!(
			session.resolve_callback(&failed),
			Err(Error::AuthenticationFailed { reason }) if reason == "server_error: boom"
		));
	}

	#[test]
	fn snapshot_round_trips_and_reports_corruption() {
		let mut snapshot = SessionSnapshot::default();

		snapshot.remember(
			&domain(),
			&client(),
			Secret::from("refresh-1"),
			macros::datetime!(2025-01-01 00:00 UTC),
		);

		let decoded = SessionSnapshot::decode(&snapshot.encode().expect("Snapshot should encode."))
			.expect("Snapshot should decode.");
		let lower = DomainId::new("contoso.onmicrosoft.com").expect("Domain fixture should be valid.");

		assert_eq!(decoded.refresh_token(&lower, &client()).map(Secret::expose), Some("refresh-1"));

		let err = SessionSnapshot::decode(br#"{"sessions":{"a":{"refresh_token":7}}}"#)
			.expect_err("Malformed snapshot should fail.");

		assert!(err.path().to_string().contains("refresh_token"));

		let mut decoded = decoded;

		assert!(decoded.forget(&domain(), &client()));
		assert!(decoded.is_empty());
	}
}
