pub mod clients;
pub mod couriers;
pub mod dispatch;
pub mod lifecycle;
pub mod payment;
pub mod pricing;
pub mod rating;
pub mod stats;
pub mod wallet;

#[cfg(test)]
pub(crate) mod fixtures;
