// src/common/test_support.rs

// Massa de dados para os testes com banco (`#[sqlx::test]`)

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::{AppState, Config},
    db::{user_repo::NewUser, DistributorRepository, ProductRepository, UserRepository},
    models::{
        distributor::{Distributor, DistributorPayload},
        product::{CreateProductPayload, Product},
        user::{User, UserRole},
    },
};

pub fn state(pool: &PgPool) -> AppState {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".into()),
        "JWT_SECRET" => Some("db-test-secret".into()),
        _ => None,
    })
    .unwrap();
    AppState::from_pool(pool.clone(), config)
}

pub async fn user(pool: &PgPool, username: &str, role: UserRole) -> User {
    let email = format!("{username}@example.com");
    UserRepository::new(pool.clone())
        .create(
            pool,
            &NewUser {
                username,
                email: &email,
                password_hash: "not-a-real-hash",
                role,
                full_name: username,
                phone: None,
                whatsapp: None,
                address: None,
                commission_rate: Decimal::ZERO,
            },
        )
        .await
        .unwrap()
}

pub async fn admin(pool: &PgPool) -> User {
    user(pool, "admin", UserRole::Admin).await
}

pub async fn distributor(pool: &PgPool, created_by: Uuid) -> Distributor {
    DistributorRepository::new(pool.clone())
        .create(
            &DistributorPayload {
                name: "Karachi Traders".into(),
                address: Some("Plot 12, SITE Area".into()),
                city: Some("Karachi".into()),
                region: None,
                postal_code: None,
                ntn_number: Some("1234567-8".into()),
                contact_person: None,
                phone: None,
                whatsapp: None,
                email: None,
                is_active: Some(true),
            },
            created_by,
        )
        .await
        .unwrap()
}

pub async fn product(pool: &PgPool, code: &str, price: Decimal, category: Option<&str>) -> Product {
    ProductRepository::new(pool.clone())
        .create(&CreateProductPayload {
            name: format!("Produto {code}"),
            code: code.to_string(),
            description: None,
            price,
            unit_of_measure: None,
            category: category.map(str::to_string),
            tax_rate: None,
        })
        .await
        .unwrap()
}
