// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::change_password,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::list_assignments,
        handlers::users::assign_distributors,
        handlers::users::unassign_distributor,

        // --- Distributors ---
        handlers::distributors::list_distributors,
        handlers::distributors::get_distributor,
        handlers::distributors::create_distributor,
        handlers::distributors::update_distributor,
        handlers::distributors::delete_distributor,
        handlers::distributors::list_contacts,
        handlers::distributors::create_contact,
        handlers::distributors::update_contact,
        handlers::distributors::delete_contact,

        // --- Products / Categories ---
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::delete_product_permanently,
        handlers::products::list_categories,
        handlers::products::create_category,
        handlers::products::update_category,
        handlers::products::delete_category,

        // --- Invoices ---
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::create_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::update_invoice_status,
        handlers::invoices::cancel_invoice,
        handlers::invoices::mark_overdue,
        handlers::documents::invoice_pdf,

        // --- Payments ---
        handlers::payments::list_payments,
        handlers::payments::get_payment,
        handlers::payments::create_payment,
        handlers::payments::delete_payment,

        // --- Dashboard ---
        handlers::dashboard::get_stats,
        handlers::dashboard::get_status_breakdown,
        handlers::dashboard::get_sales_trend,
        handlers::dashboard::get_top_products,
        handlers::dashboard::get_top_distributors,
        handlers::dashboard::get_recent_invoices,
        handlers::dashboard::get_staff_performance,
    ),
    components(
        schemas(
            // --- Auth / Users ---
            models::auth::LoginPayload,
            models::auth::ChangePasswordPayload,
            models::auth::AuthResponse,
            models::user::UserRole,
            models::user::User,
            models::user::CreateUserPayload,
            models::user::UpdateUserPayload,
            models::user::DistributorAssignment,
            models::user::AssignDistributorsPayload,

            // --- Distributors ---
            models::distributor::Distributor,
            models::distributor::DistributorContact,
            models::distributor::AssignedStaff,
            models::distributor::DistributorDetail,
            models::distributor::DistributorPayload,
            models::distributor::ContactPayload,

            // --- Products ---
            models::product::Product,
            models::product::CreateProductPayload,
            models::product::UpdateProductPayload,
            models::product::Category,
            models::product::CategoryWithCount,
            models::product::CreateCategoryPayload,
            models::product::UpdateCategoryPayload,

            // --- Invoices ---
            models::invoice::InvoiceStatus,
            models::invoice::Invoice,
            models::invoice::InvoiceSummary,
            models::invoice::InvoiceItemDetail,
            models::invoice::InvoiceDetail,
            models::invoice::InvoiceItemPayload,
            models::invoice::CreateInvoicePayload,
            models::invoice::UpdateInvoicePayload,
            models::invoice::UpdateStatusPayload,
            handlers::invoices::MarkOverdueResult,

            // --- Payments ---
            models::payment::PaymentMethod,
            models::payment::Payment,
            models::payment::PaymentSummary,
            models::payment::PaymentReceipt,
            models::payment::CreatePaymentPayload,

            // --- Dashboard ---
            models::dashboard::DashboardStats,
            models::dashboard::StatusBreakdownEntry,
            models::dashboard::SalesTrendEntry,
            models::dashboard::TopProductEntry,
            models::dashboard::TopDistributorEntry,
            models::dashboard::StaffPerformanceEntry,

            crate::common::pagination::PageMeta,
        )
    ),
    tags(
        (name = "Health", description = "Estado do serviço"),
        (name = "Auth", description = "Login, perfil e troca de senha"),
        (name = "Users", description = "Gestão de usuários e atribuições de distribuidores"),
        (name = "Distributors", description = "Distribuidores e contatos"),
        (name = "Products", description = "Catálogo de produtos"),
        (name = "Categories", description = "Categorias de produtos"),
        (name = "Invoices", description = "Faturas, status e PDF"),
        (name = "Payments", description = "Recebimentos"),
        (name = "Dashboard", description = "Indicadores e Gráficos Gerenciais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
