//! Interaction context for interactive logins.
//!
//! The backend never opens a browser on its own. It builds the authorize URL and hands it to a
//! [`PromptHost`], which shows it to the user (browser, console, embedded web view) and reports
//! where the identity provider redirected.

// self
use crate::_prelude::*;

/// Boxed future returned by [`PromptHost::authorize`].
pub type PromptFuture<'a> = Pin<Box<dyn Future<Output = Result<PromptOutcome>> + 'a + Send>>;

/// Surface capable of showing an authorization prompt to a user.
pub trait PromptHost
where
	Self: Send + Sync,
{
	/// Shows `prompt` and resolves once the user finished or dismissed it.
	fn authorize<'a>(&'a self, prompt: &'a AuthorizationPrompt) -> PromptFuture<'a>;
}

/// Everything a host needs to drive one authorization round trip.
#[derive(Clone, Debug)]
pub struct AuthorizationPrompt {
	/// Fully-formed authorize URL to open.
	pub authorize_url: Url,
	/// Redirect URI the identity provider will return to.
	pub redirect_uri: Url,
	/// Opaque state that must come back unchanged.
	pub state: String,
}

/// Result of a prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
	/// The identity provider redirected to this URL (query carries `code`/`state` or `error`).
	Redirected(Url),
	/// The user closed the prompt.
	Cancelled,
}
