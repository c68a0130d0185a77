pub mod auth;

pub use auth::{AccessContext, get_current_user};
