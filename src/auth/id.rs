//! Strongly typed identifiers for identity domains and client applications.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (domain, client).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (domain, client).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (domain, client).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier contains characters that cannot appear in an authority path segment.
	#[error("{kind} identifier contains the reserved character {found:?}.")]
	ReservedCharacter {
		/// Kind of identifier (domain, client).
		kind: &'static str,
		/// First offending character.
		found: char,
	},
}

def_id! { DomainId, "Identity domain: a tenant GUID or a verified domain name.", "Domain" }
def_id! { ClientId, "Application (client) identifier registered with the identity domain.", "Client" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if let Some(found) = view.chars().find(|c| matches!(c, '/' | '?' | '#' | '\\')) {
		return Err(IdentifierError::ReservedCharacter { kind, found });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_blank_and_padded_values() {
		assert!(DomainId::new("").is_err());
		assert!(DomainId::new(" contoso.onmicrosoft.com").is_err());
		assert!(ClientId::new("client id").is_err());

		let domain =
			DomainId::new("contoso.onmicrosoft.com").expect("Domain fixture should be valid.");

		assert_eq!(domain.as_ref(), "contoso.onmicrosoft.com");
		assert_eq!(format!("{domain:?}"), "Domain(contoso.onmicrosoft.com)");
	}

	#[test]
	fn identifiers_reject_path_characters() {
		let err = DomainId::new("tenant/../common").expect_err("Path traversal must be rejected.");

		assert_eq!(err, IdentifierError::ReservedCharacter { kind: "Domain", found: '/' });
	}

	#[test]
	fn length_limit_is_inclusive() {
		ClientId::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert!(ClientId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let client: ClientId = serde_json::from_str("\"1950a258-227b-4e31-a9cf-717495945fc2\"")
			.expect("Client identifier should deserialize successfully.");

		assert_eq!(client.as_ref(), "1950a258-227b-4e31-a9cf-717495945fc2");
		assert!(serde_json::from_str::<ClientId>("\"\"").is_err());
	}
}
