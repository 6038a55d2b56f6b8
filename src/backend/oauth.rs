//! OAuth 2.0 identity backend built on the `oauth2` crate.
//!
//! Silent logins use the `client_credentials` grant, authenticated either with a client secret in
//! the request body or with an RS256 client assertion. Interactive logins redeem a cached refresh
//! token when allowed and otherwise run an authorization-code + PKCE round trip through a
//! [`PromptHost`].

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{
		BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse, BasicTokenType,
	},
};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{Audience, ClientId, Credential, Secret},
	backend::{
		AuthoritySettings, AuthorizationPrompt, AuthorizationSession, BackendFuture, GrantKind,
		IdentityBackend, LoginRequest, PromptHost, PromptOutcome, SessionSnapshot, SilentIdentity,
		TokenErrorContext, TokenErrorKind, session,
	},
	cache::CacheHooks,
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient, TransportFailure},
	obs,
	strategy::PromptBehavior,
};

type ConfiguredClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const OFFLINE_ACCESS: &str = "offline_access";
const JTI_LEN: usize = 32;
// Upper bound for `expires_in`; anything larger is treated as a malformed response.
const MAX_EXPIRES_IN_SECS: u64 = 60 * 60 * 24 * 365;

/// [`IdentityBackend`] speaking OAuth 2.0 to an authority such as Microsoft Entra ID.
pub struct OAuth2Backend<C>
where
	C: ?Sized + TokenHttpClient,
{
	settings: AuthoritySettings,
	http_client: Arc<C>,
	prompt_host: Option<Arc<dyn PromptHost>>,
}
impl<C> OAuth2Backend<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a backend on top of a caller-supplied transport.
	pub fn with_http_client(settings: AuthoritySettings, http_client: impl Into<Arc<C>>) -> Self {
		Self { settings, http_client: http_client.into(), prompt_host: None }
	}

	/// Installs the host used to show interactive prompts.
	pub fn with_prompt_host(mut self, host: Arc<dyn PromptHost>) -> Self {
		self.prompt_host = Some(host);

		self
	}

	/// Authority settings in use.
	pub fn settings(&self) -> &AuthoritySettings {
		&self.settings
	}

	fn oauth_client(
		&self,
		request: &LoginRequest,
		client_id: &ClientId,
		secret: Option<&Secret>,
	) -> Result<ConfiguredClient> {
		let authorize = self.settings.authorize_endpoint(&request.domain)?;
		let token = self.settings.token_endpoint(&request.domain)?;
		let mut client = BasicClient::new(oauth2::ClientId::new(client_id.to_string()))
			.set_auth_uri(AuthUrl::from_url(authorize))
			.set_token_uri(TokenUrl::from_url(token))
			.set_auth_type(AuthType::RequestBody);

		if let Some(secret) = secret {
			client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}

		Ok(client)
	}

	async fn client_credentials(
		&self,
		request: &LoginRequest,
		identity: &SilentIdentity,
	) -> Result<Credential> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let scope = request.audience.default_scope();
		let (client, assertion) = match identity {
			SilentIdentity::SecretKey { client_id, secret } =>
				(self.oauth_client(request, client_id, Some(secret))?, None),
			SilentIdentity::Certificate { client_id, certificate } => {
				let token_endpoint = self.settings.token_endpoint(&request.domain)?;
				let jti = session::random_string(JTI_LEN);
				let assertion = certificate.sign_assertion(
					client_id,
					&token_endpoint,
					&jti,
					OffsetDateTime::now_utc(),
				)?;

				(self.oauth_client(request, client_id, None)?, Some(assertion))
			},
		};
		let mut exchange = client.exchange_client_credentials().add_scope(Scope::new(scope));

		if let Some(assertion) = assertion.as_deref() {
			exchange = exchange
				.add_extra_param("client_assertion_type", CLIENT_ASSERTION_TYPE)
				.add_extra_param("client_assertion", assertion);
		}

		let response = exchange.request_async(&handle).await.map_err(|e| {
			map_request_error(self.http_client.as_ref(), GrantKind::ClientCredentials, meta.take(), e)
		})?;

		credential_from_response(request, &response)
	}

	async fn redeem_refresh_token(
		&self,
		request: &LoginRequest,
		refresh_token: &Secret,
	) -> Result<(Credential, Option<Secret>)> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let client = self.oauth_client(request, &self.settings.interactive_client_id, None)?;
		let refresh = RefreshToken::new(refresh_token.expose().to_owned());
		let response = client
			.exchange_refresh_token(&refresh)
			.add_scope(Scope::new(interactive_scope(&request.audience)))
			.request_async(&handle)
			.await
			.map_err(|e| {
				map_request_error(self.http_client.as_ref(), GrantKind::RefreshToken, meta.take(), e)
			})?;
		let credential = credential_from_response(request, &response)?;

		Ok((credential, rotated_refresh_token(&response)))
	}

	async fn exchange_code(
		&self,
		request: &LoginRequest,
		session: &AuthorizationSession,
		code: String,
	) -> Result<(Credential, Option<Secret>)> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let client = self.oauth_client(request, &self.settings.interactive_client_id, None)?;
		let redirect = RedirectUrl::from_url(session.redirect_uri.clone());
		let response = client
			.exchange_code(AuthorizationCode::new(code))
			.set_pkce_verifier(PkceCodeVerifier::new(session.pkce_verifier().to_owned()))
			.set_redirect_uri(Cow::Owned(redirect))
			.add_extra_param("scope", interactive_scope(&request.audience))
			.request_async(&handle)
			.await
			.map_err(|e| {
				map_request_error(
					self.http_client.as_ref(),
					GrantKind::AuthorizationCode,
					meta.take(),
					e,
				)
			})?;
		let credential = credential_from_response(request, &response)?;

		Ok((credential, rotated_refresh_token(&response)))
	}

	async fn interactive(
		&self,
		request: &LoginRequest,
		prompt: PromptBehavior,
		mut hooks: Option<&mut CacheHooks>,
	) -> Result<Credential> {
		let client_id = &self.settings.interactive_client_id;
		let mut snapshot = restore_snapshot(hooks.as_deref());

		if prompt.reuses_session()
			&& let Some(refresh) = snapshot.refresh_token(&request.domain, client_id).cloned()
		{
			match self.redeem_refresh_token(request, &refresh).await {
				Ok((credential, rotated)) => {
					snapshot.remember(
						&request.domain,
						client_id,
						rotated.unwrap_or(refresh),
						OffsetDateTime::now_utc(),
					);
					persist_snapshot(hooks.as_deref_mut(), &snapshot)?;

					return Ok(credential);
				},
				Err(e @ (Error::AuthenticationFailed { .. } | Error::InteractionRequired { .. })) => {
					obs::cached_session_rejected(&e);
					snapshot.forget(&request.domain, client_id);
				},
				Err(e) => return Err(e),
			}
		}

		if !prompt.may_prompt() {
			return Err(Error::InteractionRequired {
				reason: "no cached session can be redeemed and prompting is disabled".into(),
			});
		}

		let host = self.prompt_host.as_ref().ok_or_else(|| Error::Unsupported {
			operation: "Interactive login",
			reason: "no prompt host is configured".into(),
		})?;
		let session = AuthorizationSession::start(
			self.settings.authorize_endpoint(&request.domain)?,
			client_id,
			self.settings.redirect_uri.clone(),
			&interactive_scope(&request.audience),
			prompt.prompt_param(),
		);
		let authorization = AuthorizationPrompt {
			authorize_url: session.authorize_url.clone(),
			redirect_uri: session.redirect_uri.clone(),
			state: session.state.clone(),
		};
		let redirected = match host.authorize(&authorization).await? {
			PromptOutcome::Redirected(url) => url,
			PromptOutcome::Cancelled => return Err(Error::UserCancelled),
		};
		let code = session.resolve_callback(&redirected)?;
		let (credential, refresh) = self.exchange_code(request, &session, code).await?;

		if let Some(refresh) = refresh {
			snapshot.remember(&request.domain, client_id, refresh, OffsetDateTime::now_utc());
		}

		persist_snapshot(hooks.as_deref_mut(), &snapshot)?;

		Ok(credential)
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2Backend<ReqwestHttpClient> {
	/// Creates a backend with the default reqwest transport configured from `settings`.
	pub fn new(settings: AuthoritySettings) -> Result<Self> {
		let http_client = ReqwestHttpClient::new(settings.timeout())?;

		Ok(Self::with_http_client(settings, Arc::new(http_client)))
	}
}
impl<C> IdentityBackend for OAuth2Backend<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn login_interactive<'a>(
		&'a self,
		request: &'a LoginRequest,
		prompt: PromptBehavior,
		hooks: Option<&'a mut CacheHooks>,
	) -> BackendFuture<'a, Credential> {
		Box::pin(self.interactive(request, prompt, hooks))
	}

	fn login_silent<'a>(
		&'a self,
		request: &'a LoginRequest,
		identity: &'a SilentIdentity,
	) -> BackendFuture<'a, Credential> {
		Box::pin(self.client_credentials(request, identity))
	}
}
impl<C> Debug for OAuth2Backend<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Backend")
			.field("settings", &self.settings)
			.field("prompt_host", &self.prompt_host.is_some())
			.finish()
	}
}

fn interactive_scope(audience: &Audience) -> String {
	format!("{} {OFFLINE_ACCESS}", audience.default_scope())
}

fn restore_snapshot(hooks: Option<&CacheHooks>) -> SessionSnapshot {
	let Some(bytes) = hooks.and_then(CacheHooks::restored) else {
		return SessionSnapshot::default();
	};

	SessionSnapshot::decode(bytes).unwrap_or_else(|e| {
		obs::snapshot_discarded(&e);

		SessionSnapshot::default()
	})
}

fn persist_snapshot(hooks: Option<&mut CacheHooks>, snapshot: &SessionSnapshot) -> Result<()> {
	if let Some(hooks) = hooks {
		hooks.persist(snapshot.encode().map_err(ConfigError::SessionEncode)?);
	}

	Ok(())
}

fn rotated_refresh_token(response: &BasicTokenResponse) -> Option<Secret> {
	response.refresh_token().map(|token| Secret::new(token.secret().to_owned()))
}

fn credential_from_response(
	request: &LoginRequest,
	response: &BasicTokenResponse,
) -> Result<Credential> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();

	if expires_in == 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}
	if expires_in > MAX_EXPIRES_IN_SECS {
		return Err(ConfigError::ExpiresInOutOfRange.into());
	}

	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;
	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "Bearer".to_owned(),
		other => other.as_ref().to_owned(),
	};

	Credential::builder(request.domain.clone(), request.audience.clone())
		.token_type(token_type)
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(|e| ConfigError::from(e).into())
}

fn map_request_error<C>(
	client: &C,
	grant: GrantKind,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
) -> Error
where
	C: ?Sized + TokenHttpClient,
{
	let meta = meta.unwrap_or_default();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(grant, &response, &meta),
		RequestTokenError::Request(error) => map_transport_error(client, &meta, error),
		RequestTokenError::Parse(source, _body) =>
			TransientError::TokenResponseParse { source, status: meta.status }.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message: format!("{grant} grant returned an unexpected response: {message}"),
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}

fn map_server_response_error(
	grant: GrantKind,
	response: &BasicErrorResponse,
	meta: &ResponseMetadata,
) -> Error {
	let ctx = TokenErrorContext::new(grant)
		.with_http_status(meta.status)
		.with_oauth_error(response.error().as_ref())
		.with_error_description(response.error_description().cloned());
	let reason = ctx.reason();

	match ctx.classify() {
		TokenErrorKind::Rejected => Error::AuthenticationFailed { reason },
		TokenErrorKind::InteractionRequired => Error::InteractionRequired { reason },
		TokenErrorKind::Cancelled => Error::UserCancelled,
		TokenErrorKind::Transient => TransientError::TokenEndpoint {
			message: reason,
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}

fn map_transport_error<C>(
	client: &C,
	meta: &ResponseMetadata,
	err: HttpClientError<C::TransportError>,
) -> Error
where
	C: ?Sized + TokenHttpClient,
{
	match err {
		HttpClientError::Reqwest(inner) => match client.classify_transport_error(&inner) {
			TransportFailure::Timeout => TransientError::TokenEndpoint {
				message: "request timed out while calling the token endpoint".into(),
				status: meta.status,
				retry_after: meta.retry_after,
			}
			.into(),
			TransportFailure::Request => ConfigError::http_client_build(*inner).into(),
			TransportFailure::Network => TransportError::network(*inner).into(),
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint {
			message: format!("HTTP client error while calling the token endpoint: {message}"),
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
		_ => TransientError::TokenEndpoint {
			message: "HTTP client error while calling the token endpoint".into(),
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	// self
	use super::*;
	use crate::{_preludet::*, auth::ClientCertificate};

	const BUNDLE: &str = include_str!("../../tests/fixtures/client.pem");

	fn secret_identity() -> SilentIdentity {
		SilentIdentity::SecretKey {
			client_id: ClientId::new("svc-client").expect("Client fixture should be valid."),
			secret: Secret::from("svc-secret"),
		}
	}

	#[tokio::test]
	async fn secret_login_posts_client_credentials_in_body() {
		let server = MockServer::start_async().await;
		let backend = build_reqwest_test_backend(&server.base_url());
		let mock = server
			.mock_async(|when, then| {
				when.method(POST)
					.path(test_token_path())
					.form_urlencoded_tuple("grant_type", "client_credentials")
					.form_urlencoded_tuple("client_id", "svc-client")
					.form_urlencoded_tuple("client_secret", "svc-secret")
					.form_urlencoded_tuple("scope", "https://datalake.azure.net//.default");
				then.status(200).header("content-type", "application/json").body(
					"{\"access_token\":\"lake-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
				);
			})
			.await;
		let request = test_login_request(Audience::data_lake());
		let credential = backend
			.login_silent(&request, &secret_identity())
			.await
			.expect("Secret login should succeed.");

		mock.assert_async().await;

		assert_eq!(credential.authorization_header(), "Bearer lake-token");
		assert_eq!(credential.audience(), &Audience::data_lake());
		assert_eq!(credential.domain().as_ref(), TEST_DOMAIN);
		assert!(credential.expires_at() > credential.issued_at());
	}

	#[tokio::test]
	async fn certificate_login_sends_signed_assertion() {
		let server = MockServer::start_async().await;
		let backend = build_reqwest_test_backend(&server.base_url());
		let mock = server
			.mock_async(|when, then| {
				when.method(POST)
					.path(test_token_path())
					.form_urlencoded_tuple("grant_type", "client_credentials")
					.form_urlencoded_tuple("client_assertion_type", CLIENT_ASSERTION_TYPE)
					.form_urlencoded_tuple_exists("client_assertion");
				then.status(200).header("content-type", "application/json").body(
					"{\"access_token\":\"cert-token\",\"token_type\":\"Bearer\",\"expires_in\":600}",
				);
			})
			.await;
		let identity = SilentIdentity::Certificate {
			client_id: ClientId::new("svc-client").expect("Client fixture should be valid."),
			certificate: ClientCertificate::from_pem(BUNDLE).expect("Fixture bundle should load."),
		};
		let credential = backend
			.login_silent(&test_login_request(Audience::management()), &identity)
			.await
			.expect("Certificate login should succeed.");

		mock.assert_async().await;

		assert_eq!(credential.access_token().expose(), "cert-token");
	}

	#[tokio::test]
	async fn token_endpoint_errors_are_classified() {
		let server = MockServer::start_async().await;
		let backend = build_reqwest_test_backend(&server.base_url());
		let mut rejected = server
			.mock_async(|when, then| {
				when.method(POST).path(test_token_path());
				then.status(401).header("content-type", "application/json").body(
					"{\"error\":\"invalid_client\",\"error_description\":\"AADSTS7000215: Invalid client secret.\"}",
				);
			})
			.await;
		let request = test_login_request(Audience::graph());
		let err = backend
			.login_silent(&request, &secret_identity())
			.await
			.expect_err("Rejected secret must fail.");

		assert!(matches!(
			&err,
			Error::AuthenticationFailed { reason } if reason.starts_with("invalid_client")
		));

		rejected.delete_async().await;

		server
			.mock_async(|when, then| {
				when.method(POST).path(test_token_path());
				then.status(503)
					.header("content-type", "application/json")
					.header("retry-after", "12")
					.body("{\"error\":\"temporarily_unavailable\"}");
			})
			.await;

		let err = backend
			.login_silent(&request, &secret_identity())
			.await
			.expect_err("Unavailable endpoint must fail.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(503), retry_after, .. })
				if retry_after == Some(Duration::seconds(12))
		));
	}

	#[tokio::test]
	async fn responses_without_expiry_are_config_errors() {
		let server = MockServer::start_async().await;
		let backend = build_reqwest_test_backend(&server.base_url());

		server
			.mock_async(|when, then| {
				when.method(POST).path(test_token_path());
				then.status(200)
					.header("content-type", "application/json")
					.body("{\"access_token\":\"no-expiry\",\"token_type\":\"Bearer\"}");
			})
			.await;

		let err = backend
			.login_silent(&test_login_request(Audience::graph()), &secret_identity())
			.await
			.expect_err("Missing expires_in must fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingExpiresIn)));
	}

	#[tokio::test]
	async fn interactive_without_host_or_session() {
		let backend = build_reqwest_test_backend("http://127.0.0.1:9");
		let request = test_login_request(Audience::graph());
		let never = backend
			.login_interactive(&request, PromptBehavior::Never, None)
			.await
			.expect_err("Prompt Never without a session must fail.");

		assert!(matches!(never, Error::InteractionRequired { .. }));

		let auto = backend
			.login_interactive(&request, PromptBehavior::Auto, None)
			.await
			.expect_err("Prompting without a host must fail.");

		assert!(matches!(auto, Error::Unsupported { .. }));

		let device = backend
			.login_device_code(&request)
			.await
			.expect_err("Device code must be unsupported.");

		assert!(matches!(device, Error::Unsupported { operation: "Device code login", .. }));
	}
}
