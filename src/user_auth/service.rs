use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;
use validator::Validate;

use super::error::AuthError;
use super::models::{AuthResponse, AuthenticatedUser, Claims, LoginRequest, RegisterRequest, User};
use super::store::UserStore;
use crate::core_types::UserId;

/// Hash a secret with argon2 and a fresh salt (PHC string)
pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))
}

/// Check a secret against a PHC string produced by [`hash_secret`]
pub fn verify_secret(secret: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored hash is not a valid PHC string: {}", e);
            false
        }
    }
}

pub struct UserAuthService {
    store: Arc<dyn UserStore>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl UserAuthService {
    pub fn new(store: Arc<dyn UserStore>, jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self {
            store,
            jwt_secret,
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest) -> Result<UserId, AuthError> {
        req.validate()
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let user = User {
            id: UserId::new(),
            email: normalize_email(&req.email),
            username: req.username.trim().to_string(),
            password_hash: hash_secret(&req.password)?,
            created_at: Utc::now(),
        };
        self.store.insert(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.id)
    }

    /// Login user and issue JWT
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .store
            .find_by_email(&normalize_email(&req.email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_secret(&req.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let (token, expires_at) = self.issue_token(user.id)?;
        Ok(AuthResponse {
            token,
            user_id: user.id,
            username: user.username,
            email: user.email,
            expires_at,
        })
    }

    /// Sign an HS256 token for `user_id`
    pub fn issue_token(&self, user_id: UserId) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".into()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Verify JWT token and resolve the caller
    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).map_err(|_| AuthError::InvalidToken)?;
        let user_id = token_data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser { user_id })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_auth::store::MemoryUserStore;

    fn service() -> UserAuthService {
        UserAuthService::new(Arc::new(MemoryUserStore::new()), "test-secret".into(), 24)
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let svc = service();
        let user_id = svc.register(register_req("alice", "Alice@Example.com")).await.unwrap();

        let resp = svc
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();

        assert_eq!(resp.user_id, user_id);
        assert_eq!(resp.email, "alice@example.com");
        assert_eq!(svc.verify_token(&resp.token).unwrap().user_id, user_id);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let svc = service();
        svc.register(register_req("bob", "bob@example.com")).await.unwrap();
        assert_eq!(
            svc.register(register_req("bob2", "bob@example.com")).await,
            Err(AuthError::DuplicateUser)
        );
        assert_eq!(
            svc.register(register_req("bob", "other@example.com")).await,
            Err(AuthError::DuplicateUser)
        );
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let svc = service();
        let mut req = register_req("carol", "not-an-email");
        assert!(matches!(
            svc.register(req).await,
            Err(AuthError::InvalidInput(_))
        ));
        req = register_req("carol", "carol@example.com");
        req.password = "short".into();
        assert!(matches!(
            svc.register(req).await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let svc = service();
        svc.register(register_req("dave", "dave@example.com")).await.unwrap();
        let err = svc
            .login(LoginRequest {
                email: "dave@example.com".into(),
                password: "wrong-password".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = UserAuthService::new(Arc::new(MemoryUserStore::new()), "other".into(), 24);
        let (token, _) = other.issue_token(UserId::new()).unwrap();
        assert_eq!(service().verify_token(&token), Err(AuthError::InvalidToken));
        assert_eq!(service().verify_token("garbage"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let svc = UserAuthService::new(Arc::new(MemoryUserStore::new()), "s".into(), -1);
        let (token, _) = svc.issue_token(UserId::new()).unwrap();
        assert_eq!(svc.verify_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_hash_roundtrip() {
        let phc = hash_secret("123").unwrap();
        assert!(verify_secret("123", &phc));
        assert!(!verify_secret("124", &phc));
        assert!(!verify_secret("123", "not-a-phc"));
    }
}
