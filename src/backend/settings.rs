//! Authority configuration for [`OAuth2Backend`](crate::backend::OAuth2Backend).

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, DomainId},
	error::ConfigError,
};

/// Errors raised while validating [`AuthoritySettings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SettingsError {
	/// Authorities must use HTTPS unless they point at a loopback host.
	#[error("Authority must use HTTPS: {url}.")]
	InsecureAuthority {
		/// Authority URL that failed validation.
		url: String,
	},
	/// Authorities must be plain hosts without query or fragment.
	#[error("Authority must not carry a query or fragment: {url}.")]
	AuthorityHasQuery {
		/// Authority URL that failed validation.
		url: String,
	},
	/// The HTTP timeout must be positive.
	#[error("Request timeout must be positive, got {seconds} seconds.")]
	NonPositiveTimeout {
		/// Rejected timeout.
		seconds: i64,
	},
}

/// Authority host, public client registration, and transport knobs.
///
/// Settings deserialize through [`AuthoritySettingsBuilder`], so a config file only needs the
/// fields it overrides and is validated on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthoritySettingsBuilder")]
pub struct AuthoritySettings {
	/// Authority host, e.g. `https://login.microsoftonline.com`.
	pub authority: Url,
	/// Public client id used for interactive logins.
	pub interactive_client_id: ClientId,
	/// Redirect URI registered for the public client.
	pub redirect_uri: Url,
	/// Timeout applied by the default reqwest transport, in seconds.
	pub timeout_secs: u64,
}
impl AuthoritySettings {
	/// Azure public cloud authority.
	pub const AZURE_PUBLIC: &'static str = "https://login.microsoftonline.com";
	/// Azure China authority.
	pub const AZURE_CHINA: &'static str = "https://login.chinacloudapi.cn";
	/// Azure US Government authority.
	pub const AZURE_US_GOVERNMENT: &'static str = "https://login.microsoftonline.us";
	/// Well-known public client registration for command-line tools.
	pub const DEFAULT_CLIENT_ID: &'static str = "1950a258-227b-4e31-a9cf-717495945fc2";
	/// Out-of-band redirect URI registered for the default client.
	pub const DEFAULT_REDIRECT_URI: &'static str = "urn:ietf:wg:oauth:2.0:oob";
	/// Default transport timeout in seconds.
	pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

	/// Returns a builder seeded with the public-cloud defaults.
	pub fn builder() -> AuthoritySettingsBuilder {
		AuthoritySettingsBuilder::default()
	}

	/// Azure public cloud defaults.
	pub fn azure_public() -> Self {
		Self::preset(Self::AZURE_PUBLIC)
	}

	/// Azure China defaults.
	pub fn azure_china() -> Self {
		Self::preset(Self::AZURE_CHINA)
	}

	/// Azure US Government defaults.
	pub fn azure_us_government() -> Self {
		Self::preset(Self::AZURE_US_GOVERNMENT)
	}

	fn preset(authority: &'static str) -> Self {
		match Self::builder().authority(well_known_url(authority)).build() {
			Ok(settings) => settings,
			Err(e) => unreachable!("authority preset `{authority}` failed to validate: {e}"),
		}
	}

	/// Authorization endpoint for `domain`.
	pub fn authorize_endpoint(&self, domain: &DomainId) -> Result<Url, ConfigError> {
		self.endpoint(domain, "authorize")
	}

	/// Token endpoint for `domain`.
	pub fn token_endpoint(&self, domain: &DomainId) -> Result<Url, ConfigError> {
		self.endpoint(domain, "token")
	}

	/// Transport timeout.
	pub fn timeout(&self) -> Duration {
		Duration::seconds(i64::try_from(self.timeout_secs).unwrap_or(i64::MAX))
	}

	fn endpoint(&self, domain: &DomainId, leaf: &str) -> Result<Url, ConfigError> {
		let base = self.authority.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}/{domain}/oauth2/v2.0/{leaf}"))
			.map_err(|source| ConfigError::InvalidEndpoint { source })
	}

	fn validate(&self) -> Result<(), SettingsError> {
		let url = &self.authority;

		if url.query().is_some() || url.fragment().is_some() {
			return Err(SettingsError::AuthorityHasQuery { url: url.to_string() });
		}
		if url.scheme() != "https" && !(url.scheme() == "http" && is_loopback(url)) {
			return Err(SettingsError::InsecureAuthority { url: url.to_string() });
		}
		if self.timeout_secs == 0 {
			return Err(SettingsError::NonPositiveTimeout { seconds: 0 });
		}

		Ok(())
	}
}
impl Default for AuthoritySettings {
	fn default() -> Self {
		Self::azure_public()
	}
}

/// Builder (and deserialization shape) for [`AuthoritySettings`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritySettingsBuilder {
	/// Authority host; defaults to the Azure public cloud.
	pub authority: Option<Url>,
	/// Public client id; defaults to [`AuthoritySettings::DEFAULT_CLIENT_ID`].
	pub interactive_client_id: Option<ClientId>,
	/// Redirect URI; defaults to [`AuthoritySettings::DEFAULT_REDIRECT_URI`].
	pub redirect_uri: Option<Url>,
	/// Timeout in seconds; defaults to [`AuthoritySettings::DEFAULT_TIMEOUT_SECS`].
	pub timeout_secs: Option<u64>,
}
impl AuthoritySettingsBuilder {
	/// Sets the authority host.
	pub fn authority(mut self, url: Url) -> Self {
		self.authority = Some(url);

		self
	}

	/// Sets the public client id used by interactive logins.
	pub fn interactive_client_id(mut self, client_id: ClientId) -> Self {
		self.interactive_client_id = Some(client_id);

		self
	}

	/// Sets the redirect URI registered for the public client.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Sets the transport timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout_secs = Some(u64::try_from(timeout.whole_seconds()).unwrap_or(0));

		self
	}

	/// Consumes the builder and validates the resulting settings.
	pub fn build(self) -> Result<AuthoritySettings, SettingsError> {
		let settings = AuthoritySettings {
			authority: self
				.authority
				.unwrap_or_else(|| well_known_url(AuthoritySettings::AZURE_PUBLIC)),
			interactive_client_id: self.interactive_client_id.unwrap_or_else(default_client_id),
			redirect_uri: self
				.redirect_uri
				.unwrap_or_else(|| well_known_url(AuthoritySettings::DEFAULT_REDIRECT_URI)),
			timeout_secs: self.timeout_secs.unwrap_or(AuthoritySettings::DEFAULT_TIMEOUT_SECS),
		};

		settings.validate()?;

		Ok(settings)
	}
}
impl TryFrom<AuthoritySettingsBuilder> for AuthoritySettings {
	type Error = SettingsError;

	fn try_from(builder: AuthoritySettingsBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

fn well_known_url(value: &'static str) -> Url {
	match Url::parse(value) {
		Ok(url) => url,
		Err(e) => unreachable!("well-known URL `{value}` failed to parse: {e}"),
	}
}

fn default_client_id() -> ClientId {
	match ClientId::new(AuthoritySettings::DEFAULT_CLIENT_ID) {
		Ok(id) => id,
		Err(e) => unreachable!("default client id failed to validate: {e}"),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
