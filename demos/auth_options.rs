//! Acquires management, data-lake, and graph credentials for one domain, sharing a file-backed
//! token cache so only the first interactive login shows a prompt.
//!
//! Set `BROKER_DOMAIN` to the tenant. Add `BROKER_CLIENT_ID` with either `BROKER_CLIENT_SECRET`
//! or `BROKER_CERT_PEM` to log in as a service identity instead of a user; an encrypted key in
//! the bundle is unlocked with `BROKER_CERT_PASSWORD`.

// std
use std::{
	env,
	io::{self, BufRead, Write},
	sync::Arc,
};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use credential_broker::{
	auth::{Audience, CertificateSource, ClientId},
	backend::{
		AuthoritySettings, AuthorizationPrompt, OAuth2Backend, PromptFuture, PromptHost,
		PromptOutcome,
	},
	cache::FileTokenCache,
	provider::CredentialProvider,
	strategy::{AuthStrategy, PromptBehavior},
	url::Url,
};

/// Prints the authorize URL and reads the redirected URL back from stdin.
struct ConsolePrompt;
impl PromptHost for ConsolePrompt {
	fn authorize<'a>(&'a self, prompt: &'a AuthorizationPrompt) -> PromptFuture<'a> {
		let authorize_url = prompt.authorize_url.clone();

		Box::pin(async move {
			let line = tokio::task::spawn_blocking(move || {
				println!("Open this URL and sign in:\n\n  {authorize_url}\n");
				print!("Paste the address your browser was redirected to (empty to cancel): ");

				io::stdout().flush().ok()?;

				let mut line = String::new();

				io::stdin().lock().read_line(&mut line).ok()?;

				Some(line.trim().to_owned())
			})
			.await
			.ok()
			.flatten()
			.filter(|line| !line.is_empty());

			Ok(match line.and_then(|line| Url::parse(&line).ok()) {
				Some(url) => PromptOutcome::Redirected(url),
				None => PromptOutcome::Cancelled,
			})
		})
	}
}

fn strategy_from_env() -> Result<AuthStrategy> {
	let client_id = env::var("BROKER_CLIENT_ID").ok().map(ClientId::new).transpose()?;

	Ok(match (client_id, env::var("BROKER_CLIENT_SECRET"), env::var("BROKER_CERT_PEM")) {
		(Some(client_id), Ok(secret), _) => AuthStrategy::secret_key(client_id, secret),
		(Some(client_id), _, Ok(path)) => {
			let mut source = CertificateSource::pem_file(path);

			if let Ok(password) = env::var("BROKER_CERT_PASSWORD") {
				source = source.with_password(password);
			}

			AuthStrategy::certificate(client_id, source)
		},
		(Some(_), _, _) =>
			return Err(eyre!("BROKER_CLIENT_ID needs BROKER_CLIENT_SECRET or BROKER_CERT_PEM")),
		(None, _, _) => {
			let path = FileTokenCache::default_location("credential-broker-demo")
				.ok_or_else(|| eyre!("no per-user data directory is available"))?;

			AuthStrategy::interactive_with_cache(
				PromptBehavior::Auto,
				Arc::new(FileTokenCache::open(path)?),
			)
		},
	})
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let domain = env::var("BROKER_DOMAIN").map_err(|_| eyre!("set BROKER_DOMAIN"))?;
	let mut settings = AuthoritySettings::azure_public();

	settings.redirect_uri = Url::parse("http://localhost")?;

	let backend = OAuth2Backend::new(settings)?.with_prompt_host(Arc::new(ConsolePrompt));
	let provider = CredentialProvider::new(Arc::new(backend));
	let strategy = strategy_from_env()?;

	println!("Strategy: {strategy:?}");

	for audience in [Audience::management(), Audience::data_lake(), Audience::graph()] {
		let credential = provider.acquire(&domain, audience.as_str(), &strategy).await?;

		println!("{audience}: {:?} until {}", credential.status(), credential.expires_at());
	}

	Ok(())
}
