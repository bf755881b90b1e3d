pub mod session;

pub use session::{removal_cookie, session_middleware, CurrentUser, SESSION_COOKIE};
