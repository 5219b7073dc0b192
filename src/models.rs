pub mod auth;
pub mod dashboard;
pub mod distributor;
pub mod invoice;
pub mod payment;
pub mod product;
pub mod user;
