// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    config::BootstrapAdmin,
    db::{user_repo::NewUser, UserRepository},
    models::{
        auth::{AuthResponse, Claims},
        user::{User, UserRole},
    },
};

/// Hash bcrypt fora do runtime assíncrono
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl_hours: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl_hours: i64, pool: PgPool) -> Self {
        Self {
            user_repo,
            jwt_secret,
            token_ttl_hours,
            pool,
        }
    }

    /// Login por username ou e-mail. Conta inativa recebe 403 mesmo com senha correta.
    pub async fn login(&self, login: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_login(login.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }

        self.user_repo.touch_last_login(user.id).await?;
        let token = self.create_token(&user)?;

        tracing::info!("🔑 Login de {} ({})", user.username, user.role.as_str());
        Ok(AuthResponse { token, user })
    }

    /// Decodifica o JWT e recarrega o usuário (papel e status sempre do banco)
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        let user = self
            .user_repo
            .find_by_id(&self.pool, claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }
        Ok(user)
    }

    pub async fn change_password(&self, user: &User, current_password: &str, new_password: &str) -> Result<(), AppError> {
        if !verify_password(current_password, &user.password_hash).await? {
            return Err(AppError::BadRequest("Current password is incorrect.".to_string()));
        }

        let hashed = hash_password(new_password).await?;
        self.user_repo.update_password(user.id, &hashed).await?;
        tracing::info!("🔒 Senha alterada para o usuário {}", user.username);
        Ok(())
    }

    /// Cria o primeiro admin a partir do ambiente quando ainda não existe nenhum
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<(), AppError> {
        if self.user_repo.count_admins().await? > 0 {
            return Ok(());
        }

        let password_hash = hash_password(&admin.password).await?;
        let user = self
            .user_repo
            .create(
                &self.pool,
                &NewUser {
                    username: &admin.username,
                    email: &admin.email,
                    password_hash: &password_hash,
                    role: UserRole::Admin,
                    full_name: &admin.full_name,
                    phone: None,
                    whatsapp: None,
                    address: None,
                    commission_rate: Decimal::ZERO,
                },
            )
            .await?;

        tracing::info!("👤 Administrador inicial criado: {}", user.username);
        Ok(())
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.token_ttl_hours);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service(ttl_hours: i64) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/invoicing_test")
            .unwrap();
        AuthService::new(UserRepository::new(pool.clone()), "test-secret".into(), ttl_hours, pool)
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ahmed.k".into(),
            email: "ahmed@example.com".into(),
            password_hash: String::new(),
            role: UserRole::SalesStaff,
            full_name: "Ahmed Khan".into(),
            phone: None,
            whatsapp: None,
            address: None,
            commission_rate: Decimal::ZERO,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_round_trips_subject_and_role() {
        let auth = service(24);
        let user = user();
        let token = auth.create_token(&user).unwrap();

        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::SalesStaff);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let auth = service(24);
        let other = AuthService {
            jwt_secret: "another-secret".into(),
            ..service(24)
        };
        let token = other.create_token(&user()).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = service(-2);
        let token = auth.create_token(&user()).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        assert!(matches!(service(1).decode_token("not.a.jwt"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("s3cret-pass").await.unwrap();
        assert!(verify_password("s3cret-pass", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }
}
