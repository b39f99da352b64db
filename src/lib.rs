pub mod backoff;
pub mod cli;
pub mod clock;
pub mod config;
pub mod identity;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use identity::{HttpIdentityClient, IdentityClient, IdentityError, Principal, TokenSet};
pub use session::{Session, SessionError, SessionManager, SessionPhase};
