// ============================
// parlor-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod users;

pub use password::{hash_password, verify_password};
pub use session::{Session, SessionManager};
pub use users::UserStore;
