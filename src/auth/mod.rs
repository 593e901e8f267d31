//! Authentication: the session mirror, the route guard and the log-in,
//! sign-up and log-out pages.

mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod session;
mod sign_up;
mod user;

pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::post_log_out;
pub use middleware::{session_guard, session_guard_hx};
pub use session::{CurrentSession, SessionContext, SessionState, SessionSubscription};
pub use sign_up::{get_sign_up_page, post_sign_up};
pub use user::{Session, User, UserId};
