//! Jumplinks redirect engine.
//!
//! Resolves requests that would otherwise 404 against an ordered table of
//! wildcard redirect rules, with timed activation, destination rewriting and
//! a legacy domain fallback.

pub mod activation;
pub mod config;
pub mod fallback;
pub mod model;
pub mod observability;
pub mod rewrite;
pub mod routing;
pub mod store;
pub mod wildcard;

pub use config::JumplinksConfig;
pub use model::{Decision, IncomingRequest, Jumplink, JumplinkId};
pub use routing::{Diagnosis, Resolver};
