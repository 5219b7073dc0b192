// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::user::UserRole,
};

/// 1. O Trait que define quais papéis uma rota aceita
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [UserRole];
    fn description() -> &'static str;
}

/// 2. O Extractor (Guardião). Depende do `auth_guard` ter rodado antes.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        if !T::allowed().contains(&user.0.role) {
            return Err(AppError::Forbidden(format!(
                "{} access is required for this action.",
                T::description()
            )));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct Admin;
impl RoleDef for Admin {
    fn allowed() -> &'static [UserRole] {
        &[UserRole::Admin]
    }
    fn description() -> &'static str {
        "Admin"
    }
}

pub type AdminOnly = RequireRole<Admin>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn parts_with(role: Option<UserRole>) -> Parts {
        let (mut parts, _) = Request::new(()).into_parts();
        if let Some(role) = role {
            parts.extensions.insert(AuthenticatedUser(User {
                id: Uuid::new_v4(),
                username: "someone".into(),
                email: "someone@example.com".into(),
                password_hash: String::new(),
                role,
                full_name: "Someone".into(),
                phone: None,
                whatsapp: None,
                address: None,
                commission_rate: Decimal::ZERO,
                is_active: true,
                last_login_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }));
        }
        parts
    }

    #[tokio::test]
    async fn admin_passes() {
        let mut parts = parts_with(Some(UserRole::Admin));
        assert!(AdminOnly::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn sales_staff_is_forbidden() {
        let mut parts = parts_with(Some(UserRole::SalesStaff));
        let err = AdminOnly::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn anonymous_is_unauthorized() {
        let mut parts = parts_with(None);
        let err = AdminOnly::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
