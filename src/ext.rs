//! Extension contracts for putting issued credentials to use.

pub mod request_signer;

pub use request_signer::*;
