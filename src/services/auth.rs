use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use crate::{
    models::{
        auth::Claims,
        user::{AuthResponse, LoginRequest, RegisterRequest, User},
    },
    services::metrics::LOGINS_COUNTER,
    store::{StoreError, UserStore},
};

/// Settings needed to hash passwords and issue tokens.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub jwt_secret: String,
    pub ttl_seconds: u64,
    pub bcrypt_cost: u32,
}

pub struct AuthService;

impl AuthService {
    /// Create an account with no family and return a fresh access token.
    pub async fn register<S>(
        store: &S,
        settings: &TokenSettings,
        req: &RegisterRequest,
    ) -> anyhow::Result<AuthResponse>
    where
        S: UserStore + ?Sized,
    {
        let email = req.email.trim().to_lowercase();
        anyhow::ensure!(email.contains('@'), "Invalid email address");
        anyhow::ensure!(req.password.len() >= 8, "Password must be at least 8 characters");
        anyhow::ensure!(!req.name.trim().is_empty(), "Name is required");

        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: bcrypt::hash(&req.password, settings.bcrypt_cost)?,
            name: req.name.trim().to_string(),
            family_id: None,
            created_at: Utc::now(),
        };
        store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");

        let access_token = Self::generate_access_token(user.id, &settings.jwt_secret, settings.ttl_seconds)?;
        Ok(AuthResponse {
            access_token,
            user: user.into(),
        })
    }

    pub async fn login<S>(
        store: &S,
        settings: &TokenSettings,
        req: &LoginRequest,
    ) -> anyhow::Result<AuthResponse>
    where
        S: UserStore + ?Sized,
    {
        let result = Self::check_credentials(store, &req.email, &req.password).await;
        let status = if result.is_ok() { "success" } else { "failure" };
        LOGINS_COUNTER.with_label_values(&[status]).inc();

        let user = result?;
        let access_token = Self::generate_access_token(user.id, &settings.jwt_secret, settings.ttl_seconds)?;
        Ok(AuthResponse {
            access_token,
            user: user.into(),
        })
    }

    async fn check_credentials<S>(store: &S, email: &str, password: &str) -> anyhow::Result<User>
    where
        S: UserStore + ?Sized,
    {
        let user = store
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Invalid credentials"))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| anyhow::anyhow!("Invalid credentials"))?;
        if !valid {
            anyhow::bail!("Invalid credentials");
        }
        Ok(user)
    }

    pub fn generate_access_token(user_id: Uuid, secret: &str, ttl_seconds: u64) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// True when registration failed only because the email is taken.
    pub fn is_duplicate_email(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Conflict(_)))
    }
}
