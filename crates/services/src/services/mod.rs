pub mod config;
pub mod email;
pub mod export;
pub mod notify;
pub mod payments;
