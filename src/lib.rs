//! Pluggable credential provider: interactive, cached, secret-key, and certificate logins behind
//! one typed `acquire` call.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod backend;
pub mod cache;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod provider;
pub mod strategy;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		backend::{AuthoritySettings, LoginRequest, OAuth2Backend},
		http::ReqwestHttpClient,
	};

	/// Backend type alias used by reqwest-backed tests.
	pub type ReqwestTestBackend = OAuth2Backend<ReqwestHttpClient>;

	/// Domain used by test fixtures.
	pub const TEST_DOMAIN: &str = "contoso.onmicrosoft.com";

	/// Builds settings whose authority points at a loopback mock server.
	pub fn test_authority_settings(base_url: &str) -> AuthoritySettings {
		AuthoritySettings::builder()
			.authority(Url::parse(base_url).expect("Mock authority URL should parse."))
			.timeout(Duration::seconds(5))
			.build()
			.expect("Mock authority settings should validate.")
	}

	/// Constructs an [`OAuth2Backend`] pointed at the provided mock authority.
	pub fn build_reqwest_test_backend(base_url: &str) -> ReqwestTestBackend {
		OAuth2Backend::new(test_authority_settings(base_url))
			.expect("Reqwest test backend should build.")
	}

	/// Login request for [`TEST_DOMAIN`] and the given audience.
	pub fn test_login_request(audience: crate::auth::Audience) -> LoginRequest {
		LoginRequest::new(
			crate::auth::DomainId::new(TEST_DOMAIN).expect("Test domain should be valid."),
			audience,
		)
	}

	/// Path of the token endpoint for [`TEST_DOMAIN`].
	pub fn test_token_path() -> String {
		format!("/{TEST_DOMAIN}/oauth2/v2.0/token")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
