// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        DashboardRepository, DistributorRepository, InvoiceRepository, PaymentRepository,
        ProductRepository, UserRepository,
    },
    services::{
        auth::AuthService, dashboard_service::DashboardService,
        distributor_service::DistributorService, document_service::DocumentService,
        invoice_service::InvoiceService, payment_service::PaymentService,
        product_service::ProductService, user_service::UserService,
    },
};

/// Primeiro admin, criado na inicialização quando o banco ainda não tem nenhum
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    // Vazio = qualquer origem
    pub cors_origins: Vec<String>,
    // 0 desliga a varredura de vencidas
    pub overdue_sweep_interval_secs: u64,
    pub fonts_dir: String,
    pub company_name: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de busca (ambiente ou testes)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} deve ser definida"));
        let parsed = |key: &str, default: u64| -> anyhow::Result<u64> {
            match get(key) {
                Some(raw) => raw.parse().with_context(|| format!("{key} inválida: {raw}")),
                None => Ok(default),
            }
        };

        let bootstrap_admin = match (get("ADMIN_USERNAME"), get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(username), Some(email), Some(password)) => {
                if password.chars().count() < 8 {
                    return Err(anyhow!("ADMIN_PASSWORD precisa ter pelo menos 8 caracteres"));
                }
                Some(BootstrapAdmin {
                    username,
                    email,
                    password,
                    full_name: get("ADMIN_FULL_NAME").unwrap_or_else(|| "Administrator".to_string()),
                })
            }
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expires_in_hours: parsed("JWT_EXPIRES_IN_HOURS", 168)? as i64,
            server_addr: get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5)? as u32,
            db_acquire_timeout_secs: parsed("DB_ACQUIRE_TIMEOUT_SECS", 3)?,
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            overdue_sweep_interval_secs: parsed("OVERDUE_SWEEP_INTERVAL_SECS", 3600)?,
            fonts_dir: get("FONTS_DIR").unwrap_or_else(|| "./fonts".to_string()),
            company_name: get("COMPANY_NAME").unwrap_or_else(|| "Sales & Invoicing".to_string()),
            bootstrap_admin,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub distributor_service: DistributorService,
    pub product_service: ProductService,
    pub invoice_service: InvoiceService,
    pub payment_service: PaymentService,
    pub dashboard_service: DashboardService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(Self::from_pool(db_pool, config))
    }

    /// Monta o gráfico de dependências sobre um pool já criado
    pub fn from_pool(db_pool: PgPool, config: Config) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let distributor_repo = DistributorRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let invoice_repo = InvoiceRepository::new(db_pool.clone());
        let payment_repo = PaymentRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.jwt_expires_in_hours,
            db_pool.clone(),
        );
        let user_service = UserService::new(user_repo.clone(), distributor_repo.clone(), db_pool.clone());
        let distributor_service = DistributorService::new(distributor_repo.clone(), db_pool.clone());
        let product_service = ProductService::new(product_repo.clone(), db_pool.clone());
        let invoice_service = InvoiceService::new(
            invoice_repo.clone(),
            product_repo,
            distributor_repo,
            payment_repo.clone(),
            user_repo,
            db_pool.clone(),
        );
        let payment_service = PaymentService::new(payment_repo, invoice_repo, db_pool.clone());
        let dashboard_service = DashboardService::new(dashboard_repo);
        let document_service = DocumentService::new(
            invoice_service.clone(),
            config.company_name.clone(),
            config.fonts_dir.clone(),
        );

        Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            user_service,
            distributor_service,
            product_service,
            invoice_service,
            payment_service,
            dashboard_service,
            document_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/invoicing"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.jwt_expires_in_hours, 168);
        assert_eq!(config.server_addr, "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.overdue_sweep_interval_secs, 3600);
        assert!(config.cors_origins.is_empty());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn missing_secret_fails() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CORS_ORIGINS", "http://localhost:5173, https://app.example.com,"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "https://app.example.com"]
        );
    }

    #[test]
    fn invalid_number_is_reported() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("OVERDUE_SWEEP_INTERVAL_SECS", "hourly"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn bootstrap_admin_requires_all_fields_and_strong_password() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ADMIN_USERNAME", "admin"));
        vars.push(("ADMIN_EMAIL", "admin@example.com"));
        assert!(Config::from_lookup(lookup(&vars)).unwrap().bootstrap_admin.is_none());

        let mut weak = vars.clone();
        weak.push(("ADMIN_PASSWORD", "short"));
        assert!(Config::from_lookup(lookup(&weak)).is_err());

        vars.push(("ADMIN_PASSWORD", "change-me-now"));
        let admin = Config::from_lookup(lookup(&vars)).unwrap().bootstrap_admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.full_name, "Administrator");
    }
}
