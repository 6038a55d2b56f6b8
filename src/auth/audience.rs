//! Token audiences (resource URIs) and their scope encoding.

// self
use crate::_prelude::*;

/// Errors raised when parsing an [`Audience`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AudienceError {
	/// The audience string was empty or whitespace.
	#[error("Audience cannot be empty.")]
	Empty,
	/// The audience is not an absolute URI.
	#[error("Audience `{value}` is not an absolute URI: {source}.")]
	Malformed {
		/// Offending input.
		value: String,
		/// Underlying parse failure.
		#[source]
		source: url::ParseError,
	},
}

/// Resource URI a credential is issued for.
///
/// The input must be an absolute URI, but only surrounding whitespace is removed: case and
/// trailing slashes survive, so the audience reported on a
/// [`Credential`](crate::auth::Credential) equals the one requested and the scope sent upstream
/// is built from the caller's spelling.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Audience(String);
impl Audience {
	/// Parses an audience URI.
	pub fn parse(value: impl AsRef<str>) -> Result<Self, AudienceError> {
		let view = value.as_ref().trim();

		if view.is_empty() {
			return Err(AudienceError::Empty);
		}

		Url::parse(view)
			.map(|_| Self(view.to_owned()))
			.map_err(|source| AudienceError::Malformed { value: view.to_owned(), source })
	}

	/// Resource management API audience.
	pub fn management() -> Self {
		Self::well_known("https://management.core.windows.net/")
	}

	/// Data Lake data-plane audience.
	pub fn data_lake() -> Self {
		Self::well_known("https://datalake.azure.net/")
	}

	/// Directory graph API audience.
	pub fn graph() -> Self {
		Self::well_known("https://graph.windows.net/")
	}

	fn well_known(value: &'static str) -> Self {
		Self(value.to_owned())
	}

	/// Returns the audience parsed as a URL (normalized by the URL parser).
	pub fn to_url(&self) -> Result<Url, url::ParseError> {
		Url::parse(&self.0)
	}

	/// Returns the audience exactly as supplied.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Scope string requesting every statically consented permission for this audience.
	///
	/// Trailing slashes are preserved, so `https://management.core.windows.net/` becomes
	/// `https://management.core.windows.net//.default`.
	pub fn default_scope(&self) -> String {
		let raw = self.as_str();

		if raw.ends_with("/.default") { raw.to_owned() } else { format!("{raw}/.default") }
	}
}
impl AsRef<str> for Audience {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl From<Audience> for String {
	fn from(value: Audience) -> Self {
		value.0
	}
}
impl TryFrom<String> for Audience {
	type Error = AudienceError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}
impl FromStr for Audience {
	type Err = AudienceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl Debug for Audience {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Audience({})", self.0)
	}
}
impl Display for Audience {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
