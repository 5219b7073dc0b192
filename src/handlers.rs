// src/handlers.rs

pub mod auth;
pub mod dashboard;
pub mod distributors;
pub mod documents;
pub mod invoices;
pub mod payments;
pub mod products;
pub mod users;
