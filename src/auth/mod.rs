//! Registration, log-in and log-out, and the middleware that gates routes on
//! the session's log-in state.

mod log_in;
mod log_out;
mod middleware;
mod register_user;

pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{auth_only, guest_only};
pub use register_user::{get_register_page, register_user};
