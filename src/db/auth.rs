use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::db::models::{Identity, Session};
use crate::db::{DbError, repo};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("weak_password: password is too weak")]
    WeakPassword,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("User already registered")]
    EmailTaken,

    #[error("session expired or revoked")]
    InvalidSession,

    #[error(transparent)]
    Backend(#[from] DbError),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => {
                "Invalid email or password. Please check your credentials and try again.".into()
            }
            AuthError::WeakPassword => {
                "Password must contain at least one lowercase letter, one uppercase letter, and one number."
                    .into()
            }
            AuthError::InvalidEmail => {
                "Invalid email format. Please enter a valid email address.".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Backend(DbError::Sqlx(err))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    sid: Uuid,
    email: String,
    iat: i64,
    exp: i64,
}

#[derive(sqlx::FromRow)]
struct Credentials {
    id: Uuid,
    email: String,
    password_hash: String,
}

/// Identity provider: password accounts plus revocable signed sessions.
pub struct AuthService {
    pool: SqlitePool,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AuthService {
    pub fn new(pool: SqlitePool, secret: &str, ttl_secs: i64) -> Self {
        Self {
            pool,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        check_password_strength(password)?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.pool)
            .await?;
        if exists > 0 {
            return Err(AuthError::EmailTaken);
        }

        let id = Uuid::new_v4();
        let hash = hash_password(password)?;
        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(&email)
            .bind(&hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(registration_error)?;
        repo::create_profile(&self.pool, id).await?;
        tracing::info!(user_id = %id, "account created");

        self.open_session(Identity { id, email }).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        let row = sqlx::query_as::<_, Credentials>(
            "SELECT id, email, password_hash FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };

        let parsed = PasswordHash::new(&row.password_hash).map_err(DbError::from)?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(Identity {
            id: row.id,
            email: row.email,
        })
        .await
    }

    /// Validates an access token against its signature, expiry and the live session row.
    pub async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode(access_token)?;
        let live = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sessions WHERE id = ? AND user_id = ? AND expires_at > ?",
        )
        .bind(claims.sid)
        .bind(claims.sub)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;
        if live == 0 {
            return Err(AuthError::InvalidSession);
        }
        Ok(Identity {
            id: claims.sub,
            email: claims.email,
        })
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.decode(access_token)?;
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(claims.sid)
            .execute(&self.pool)
            .await?;
        tracing::info!(user_id = %claims.sub, "session revoked");
        Ok(())
    }

    /// Deletes session rows past their expiry and returns how many went.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(purged)
    }

    async fn open_session(&self, user: Identity) -> Result<Session, AuthError> {
        let sid = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id,
            sid,
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let access_token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(DbError::from)?;

        sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(sid)
            .bind(user.id)
            .bind(now)
            .bind(expires_at.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(Session {
            access_token,
            expires_at,
            user,
        })
    }

    fn decode(&self, access_token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(access_token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!("rejected access token: {err}");
                AuthError::InvalidSession
            })
    }
}

/// A concurrent sign-up can pass the duplicate check and still lose the insert.
fn registration_error(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::EmailTaken,
        _ => AuthError::from(err),
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}

fn check_password_strength(password: &str) -> Result<(), AuthError> {
    let strong = password.chars().count() >= 8
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit());
    if strong { Ok(()) } else { Err(AuthError::WeakPassword) }
}

fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repo::tests::memory_pool;

    pub(crate) async fn service() -> AuthService {
        AuthService::new(memory_pool().await, "test-secret", 3600)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = service().await;
        let created = auth.sign_up("Dana@Example.com ", "Secret123").await.unwrap();
        assert_eq!(created.user.email, "dana@example.com");

        let session = auth.sign_in("dana@example.com", "Secret123").await.unwrap();
        assert_eq!(session.user.id, created.user.id);
        let user = auth.get_user(&session.access_token).await.unwrap();
        assert_eq!(user, created.user);
    }

    #[tokio::test]
    async fn sign_up_creates_empty_profile() {
        let auth = service().await;
        let session = auth.sign_up("erin@example.com", "Secret123").await.unwrap();
        let profile = repo::get_profile(&auth.pool, session.user.id).await.unwrap().unwrap();
        assert_eq!(profile.id, session.user.id);
        assert!(profile.full_name.is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let auth = service().await;
        auth.sign_up("frank@example.com", "Secret123").await.unwrap();
        let err = auth.sign_in("frank@example.com", "Secret124").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = auth.sign_in("nobody@example.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sign_up_rejects_weak_passwords_bad_emails_and_duplicates() {
        let auth = service().await;
        for weak in ["short1A", "alllowercase1", "ALLUPPERCASE1", "NoDigitsHere"] {
            let err = auth.sign_up("gina@example.com", weak).await.unwrap_err();
            assert!(matches!(err, AuthError::WeakPassword), "{weak}");
        }
        let err = auth.sign_up("not-an-email", "Secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail));

        auth.sign_up("gina@example.com", "Secret123").await.unwrap();
        let err = auth.sign_up("gina@example.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn sign_out_revokes_token() {
        let auth = service().await;
        let session = auth.sign_up("hank@example.com", "Secret123").await.unwrap();
        auth.sign_out(&session.access_token).await.unwrap();
        let err = auth.get_user(&session.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }

    #[tokio::test]
    async fn tokens_from_another_secret_are_rejected() {
        let auth = service().await;
        let other = AuthService::new(auth.pool.clone(), "other-secret", 3600);
        let session = other.sign_up("ivy@example.com", "Secret123").await.unwrap();
        let err = auth.get_user(&session.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }

    #[tokio::test]
    async fn losing_the_insert_race_reports_email_taken() {
        let auth = service().await;
        auth.sign_up("jay@example.com", "Secret123").await.unwrap();
        let err = sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(Uuid::new_v4())
            .bind("jay@example.com")
            .bind("hash")
            .bind(Utc::now())
            .execute(&auth.pool)
            .await
            .unwrap_err();
        let err = registration_error(err);
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(err.user_message(), "User already registered");
    }

    #[tokio::test]
    async fn purge_drops_only_expired_rows() {
        let pool = memory_pool().await;
        let short = AuthService::new(pool.clone(), "test-secret", 1);
        let long = AuthService::new(pool.clone(), "test-secret", 3600);
        for n in 0..3 {
            short.sign_up(&format!("temp{n}@example.com"), "Secret123").await.unwrap();
        }
        let kept = long.sign_up("kate@example.com", "Secret123").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
        assert_eq!(long.purge_expired().await.unwrap(), 3);

        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert!(long.get_user(&kept.access_token).await.is_ok());
    }

    #[test]
    fn user_messages_are_fixed_for_known_errors() {
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            "Invalid email or password. Please check your credentials and try again."
        );
        assert!(AuthError::WeakPassword.user_message().starts_with("Password must contain"));
        assert!(AuthError::InvalidEmail.user_message().starts_with("Invalid email format"));
        assert_eq!(AuthError::EmailTaken.user_message(), "User already registered");
    }
}
