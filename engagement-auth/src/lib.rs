//! HTTP authorization for the engagement orchestration core (spec §6.1):
//! resolves an incoming request to one of three principals — an end
//! user identified by a bearer token validated against the user store,
//! a service-role bearer for server-to-server calls, or a scheduler
//! presenting the shared `cron_secret` header — and fails closed when
//! an internal/cron endpoint sees neither of the latter two.

mod end_user;
mod extractor;
mod principal;
mod service;

pub use end_user::{EndUserTokenStore, InMemoryUserTokenStore};
pub use extractor::{AnyPrincipal, AuthState, EndUserAuthState, InternalOnly};
pub use principal::Principal;
pub use service::{authenticate, authenticate_internal, AuthConfig};
