pub mod dashboard_repo;
pub mod distributor_repo;
pub mod invoice_repo;
pub mod payment_repo;
pub mod product_repo;
pub mod user_repo;

pub use dashboard_repo::DashboardRepository;
pub use distributor_repo::DistributorRepository;
pub use invoice_repo::InvoiceRepository;
pub use payment_repo::PaymentRepository;
pub use product_repo::ProductRepository;
pub use user_repo::UserRepository;
