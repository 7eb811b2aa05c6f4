pub mod actor;
pub mod client;
pub mod courier;
pub mod event;
pub mod order;
pub mod rating;
pub mod withdrawal;
pub mod zone;
