pub mod flash;
pub mod manager;
pub mod signing;

pub use manager::{SessionData, SessionManager, SESSION_COOKIE};
pub use signing::{CookieSigner, SigningError};
