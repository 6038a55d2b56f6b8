//! Identity-domain identifiers, audiences, secrets, certificates, and issued credentials.

pub mod audience;
pub mod certificate;
pub mod credential;
pub mod id;
pub mod secret;

pub use audience::*;
pub use certificate::*;
pub use credential::*;
pub use id::*;
pub use secret::*;
