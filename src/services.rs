pub mod auth;
pub mod dashboard_service;
pub mod distributor_service;
pub mod document_service;
pub mod invoice_service;
pub mod payment_service;
pub mod pricing;
pub mod product_service;
pub mod user_service;
