//! Logging in and out, and keeping track of who is logged in.

mod session;
mod subscription;
pub mod token;

pub use session::{ADMIN_ROLE, AuthError, Identity, Session, SessionStore};
pub use subscription::Subscription;
