pub mod conference;
pub mod invite;
pub mod notification;
pub mod paper;
pub mod payment;
pub mod review;
pub mod session;
pub mod user;

#[cfg(test)]
pub(crate) mod test_utils;
