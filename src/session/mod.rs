//! Session lifecycle: obtain, renew, validate, and discard a
//! bearer-token-backed session against a remote identity endpoint.
//!
//! Refresh is checked lazily on each `ensure_valid` call; there is no
//! background renewer. Layered fallback keeps sessions alive across
//! transient backend failures: bounded refresh retries, then one
//! grace-verification of the stale token, then termination.

mod errors;
mod manager;
mod phase;
mod store;

pub use errors::SessionError;
pub use manager::SessionManager;
pub use phase::{SessionPhase, classify};
pub use store::Session;
