//! Client certificates used for certificate-backed client assertions.
//!
//! A certificate is supplied as a PEM bundle holding the X.509 certificate and its RSA private
//! key: PKCS#1, PKCS#8, or password-protected PKCS#8 (`ENCRYPTED PRIVATE KEY`). Loading validates
//! both halves up front so a bad bundle or a wrong password fails before any network traffic.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, pkcs1::EncodeRsaPrivateKey};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
};

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const KEY_TAGS: [&str; 2] = ["PRIVATE KEY", "RSA PRIVATE KEY"];
const ENCRYPTED_KEY_TAG: &str = "ENCRYPTED PRIVATE KEY";

/// Errors raised while loading certificate material or signing assertions.
#[derive(Debug, ThisError)]
pub enum CertificateError {
	/// The certificate file could not be read.
	#[error("Failed to read certificate file {}.", path.display())]
	Read {
		/// Path that failed.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The bundle is not valid PEM.
	#[error("Certificate bundle is not valid PEM.")]
	Parse(#[from] pem::PemError),
	/// The input contained no PEM blocks at all.
	#[error("Certificate bundle contains no PEM blocks.")]
	NoPemBlocks,
	/// No `CERTIFICATE` block was found.
	#[error("Certificate bundle contains no CERTIFICATE block.")]
	MissingCertificate,
	/// No private key block was found.
	#[error("Certificate bundle contains no private key.")]
	MissingPrivateKey,
	/// The private key is password protected but no password was supplied.
	#[error("Private key is encrypted; a password is required.")]
	PasswordRequired,
	/// The encrypted private key could not be decrypted (wrong password or unsupported scheme).
	#[error("Failed to decrypt the private key.")]
	Decrypt(#[source] pkcs8::Error),
	/// The decrypted private key could not be re-encoded for signing.
	#[error("Failed to encode the decrypted private key.")]
	KeyEncoding(#[source] rsa::pkcs1::Error),
	/// The private key is not a usable RSA key.
	#[error("Private key is not a valid RSA key.")]
	InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
	/// The client assertion could not be signed.
	#[error("Failed to sign the client assertion.")]
	Sign(#[source] jsonwebtoken::errors::Error),
}

/// Where certificate material comes from.
#[derive(Clone)]
pub enum CertificateSource {
	/// PEM bundle on disk.
	PemFile {
		/// Bundle path.
		path: PathBuf,
		/// Password protecting the private key, if it is encrypted.
		password: Option<Secret>,
	},
	/// Inline PEM bundle.
	Pem {
		/// Bundle contents.
		bundle: String,
		/// Password protecting the private key, if it is encrypted.
		password: Option<Secret>,
	},
	/// Certificate that was already loaded.
	Loaded(ClientCertificate),
}
impl CertificateSource {
	/// Bundle on disk without a password.
	pub fn pem_file(path: impl Into<PathBuf>) -> Self {
		Self::PemFile { path: path.into(), password: None }
	}

	/// Inline bundle without a password.
	pub fn pem(bundle: impl Into<String>) -> Self {
		Self::Pem { bundle: bundle.into(), password: None }
	}

	/// Attaches the password that decrypts the private key. Ignored for loaded certificates.
	pub fn with_password(mut self, secret: impl Into<Secret>) -> Self {
		match &mut self {
			Self::PemFile { password, .. } | Self::Pem { password, .. } =>
				*password = Some(secret.into()),
			Self::Loaded(_) => {},
		}

		self
	}

	/// Loads and validates the certificate.
	pub fn load(&self) -> Result<ClientCertificate, CertificateError> {
		match self {
			Self::PemFile { path, password } =>
				ClientCertificate::from_pem_file(path, password.as_ref()),
			Self::Pem { bundle, password } =>
				ClientCertificate::from_pem_with_password(bundle, password.as_ref()),
			Self::Loaded(certificate) => Ok(certificate.clone()),
		}
	}
}
impl Debug for CertificateSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::PemFile { path, password } => f
				.debug_struct("PemFile")
				.field("path", path)
				.field("password", &password.is_some())
				.finish(),
			Self::Pem { password, .. } => f
				.debug_struct("Pem")
				.field("bundle", &"<redacted>")
				.field("password", &password.is_some())
				.finish(),
			Self::Loaded(certificate) => f.debug_tuple("Loaded").field(certificate).finish(),
		}
	}
}

/// Parsed certificate plus the RSA key that signs client assertions.
#[derive(Clone)]
pub struct ClientCertificate {
	thumbprint: String,
	key: EncodingKey,
}
impl ClientCertificate {
	/// Lifetime of a signed client assertion.
	pub const ASSERTION_LIFETIME: Duration = Duration::minutes(10);

	/// Reads and parses a PEM bundle from disk, decrypting the key with `password` if needed.
	pub fn from_pem_file(
		path: impl AsRef<Path>,
		password: Option<&Secret>,
	) -> Result<Self, CertificateError> {
		let path = path.as_ref();
		let bytes = fs::read(path)
			.map_err(|source| CertificateError::Read { path: path.to_path_buf(), source })?;

		Self::from_pem_with_password(bytes, password)
	}

	/// Parses a PEM bundle holding a certificate and its unencrypted private key.
	pub fn from_pem(bundle: impl AsRef<[u8]>) -> Result<Self, CertificateError> {
		Self::from_pem_with_password(bundle, None)
	}

	/// Parses a PEM bundle, decrypting an `ENCRYPTED PRIVATE KEY` block with `password`.
	///
	/// A password supplied for an unencrypted key is ignored.
	pub fn from_pem_with_password(
		bundle: impl AsRef<[u8]>,
		password: Option<&Secret>,
	) -> Result<Self, CertificateError> {
		let blocks = pem::parse_many(bundle)?;

		if blocks.is_empty() {
			return Err(CertificateError::NoPemBlocks);
		}

		let certificate = blocks
			.iter()
			.find(|block| block.tag() == CERTIFICATE_TAG)
			.ok_or(CertificateError::MissingCertificate)?;

		let key = match blocks.iter().find(|block| block.tag() == ENCRYPTED_KEY_TAG) {
			Some(block) =>
				decrypt_key(block, password.ok_or(CertificateError::PasswordRequired)?)?,
			None => {
				let block = blocks
					.iter()
					.find(|block| KEY_TAGS.contains(&block.tag()))
					.ok_or(CertificateError::MissingPrivateKey)?;

				EncodingKey::from_rsa_pem(pem::encode(block).as_bytes())
					.map_err(CertificateError::InvalidPrivateKey)?
			},
		};

		Ok(Self { thumbprint: thumbprint(certificate.contents()), key })
	}

	/// Base64url SHA-256 digest of the DER certificate (`x5t#S256`).
	pub fn thumbprint(&self) -> &str {
		&self.thumbprint
	}

	/// Signs an RS256 client assertion for `client_id` addressed to `token_endpoint`.
	pub fn sign_assertion(
		&self,
		client_id: &ClientId,
		token_endpoint: &Url,
		jti: &str,
		now: OffsetDateTime,
	) -> Result<String, CertificateError> {
		let mut header = Header::new(Algorithm::RS256);

		header.x5t_s256 = Some(self.thumbprint.clone());

		let issued = now.unix_timestamp();
		let claims = AssertionClaims {
			aud: token_endpoint.as_str(),
			iss: client_id.as_ref(),
			sub: client_id.as_ref(),
			jti,
			nbf: issued,
			iat: issued,
			exp: (now + Self::ASSERTION_LIFETIME).unix_timestamp(),
		};

		jsonwebtoken::encode(&header, &claims, &self.key).map_err(CertificateError::Sign)
	}
}
impl Debug for ClientCertificate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCertificate")
			.field("thumbprint", &self.thumbprint)
			.field("key", &"<redacted>")
			.finish()
	}
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
	aud: &'a str,
	iss: &'a str,
	sub: &'a str,
	jti: &'a str,
	nbf: i64,
	iat: i64,
	exp: i64,
}

fn decrypt_key(block: &pem::Pem, password: &Secret) -> Result<EncodingKey, CertificateError> {
	let key = RsaPrivateKey::from_pkcs8_encrypted_pem(&pem::encode(block), password.expose())
		.map_err(CertificateError::Decrypt)?;
	let der = key.to_pkcs1_der().map_err(CertificateError::KeyEncoding)?;

	Ok(EncodingKey::from_rsa_der(der.as_bytes()))
}

fn thumbprint(der: &[u8]) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(der))
}
