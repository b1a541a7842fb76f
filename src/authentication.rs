use std::sync::Arc;

use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::Config;
use crate::db_helpers::get_user_by_id;
use crate::errors::RequestError;
use crate::models::User;
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaim {
    sub: i64,
    username: String,
    email: String,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaim {
    sub: i64,
    jti: String,
    exp: i64,
}

/// The authenticated requester. Carries the user row without credentials.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Like `AuthUser`, but anonymous requests (and stale tokens) pass as `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

pub fn app_state(parts: &Parts) -> Result<Arc<AppState>, RequestError> {
    parts
        .extensions
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or_else(|| RequestError::ServerError(anyhow::anyhow!("AppState extension missing")))
}

/// Cookie first, then `Authorization: Bearer <token>`.
fn access_token_from_parts(parts: &Parts) -> Result<Option<String>, RequestError> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok(Some(cookie.value().to_owned()));
        }
    }

    let header = match parts.headers.get(AUTHORIZATION) {
        Some(header) => header,
        None => return Ok(None),
    };
    let header = header.to_str().map_err(|_| {
        tracing::debug!("authorization header is not valid utf-8");
        RequestError::NotAuthorized("Invalid access token")
    })?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_owned())),
        _ => Err(RequestError::NotAuthorized("Invalid access token")),
    }
}

async fn resolve_user(state: &AppState, token: &str) -> Result<User, RequestError> {
    let id = verify_access_token(&state.config, token)?;
    get_user_by_id(&state.pool, id)
        .await?
        .ok_or(RequestError::NotAuthorized("Invalid access token"))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let state = app_state(parts)?;
        let token = access_token_from_parts(parts)?
            .ok_or(RequestError::NotAuthorized("Unauthorized request"))?;
        let user = resolve_user(&state, &token).await?;
        Ok(AuthUser(user))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let state = app_state(parts)?;
        let token = match access_token_from_parts(parts) {
            Ok(Some(token)) => token,
            Ok(None) | Err(_) => return Ok(MaybeUser(None)),
        };
        match resolve_user(&state, &token).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(RequestError::NotAuthorized(reason)) => {
                tracing::debug!(reason, "ignoring unusable access token on public route");
                Ok(MaybeUser(None))
            }
            Err(error) => Err(error),
        }
    }
}

fn expiry(lifetime: std::time::Duration) -> Result<i64> {
    let lifetime = time::Duration::try_from(lifetime).context("Token lifetime out of range")?;
    Ok((OffsetDateTime::now_utc() + lifetime).unix_timestamp())
}

pub fn generate_access_token(config: &Config, user: &User) -> Result<String> {
    let claim = AccessClaim {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        exp: expiry(config.access_token_expiry)?,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(config.access_token_secret.as_ref()),
    )
    .context("Failed to generate access token")
}

pub fn generate_refresh_token(config: &Config, user_id: i64) -> Result<String> {
    let claim = RefreshClaim {
        sub: user_id,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expiry(config.refresh_token_expiry)?,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(config.refresh_token_secret.as_ref()),
    )
    .context("Failed to generate refresh token")
}

fn decode_claim<T: serde::de::DeserializeOwned>(
    secret: &str,
    token: &str,
) -> Result<T, RequestError> {
    let token_data = jsonwebtoken::decode::<T>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_ref()),
        &jsonwebtoken::Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected token");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                RequestError::NotAuthorized("Token expired")
            }
            _ => RequestError::NotAuthorized("Invalid token"),
        }
    })?;
    Ok(token_data.claims)
}

/// Stateless signature and expiry check. Returns the user id.
pub fn verify_access_token(config: &Config, token: &str) -> Result<i64, RequestError> {
    let claim: AccessClaim = decode_claim(&config.access_token_secret, token)?;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Token expired"));
    }
    Ok(claim.sub)
}

/// Signature and expiry only. Whether the token is still the user's current
/// one is decided against the stored value.
pub fn verify_refresh_token(config: &Config, token: &str) -> Result<i64, RequestError> {
    let claim: RefreshClaim = decode_claim(&config.refresh_token_secret, token)?;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Refresh token expired"));
    }
    Ok(claim.sub)
}

fn token_cookie(name: &'static str, value: String, config: &Config) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .finish()
}

pub fn with_auth_cookies(
    jar: CookieJar,
    config: &Config,
    access_token: &str,
    refresh_token: &str,
) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        access_token.to_owned(),
        config,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        refresh_token.to_owned(),
        config,
    ))
}

pub fn without_auth_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    jar.remove(token_cookie(ACCESS_TOKEN_COOKIE, String::new(), config))
        .remove(token_cookie(REFRESH_TOKEN_COOKIE, String::new(), config))
}

pub async fn verify_password_argon2(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Stored password hash is malformed"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use chrono::NaiveDate;

    use super::*;

    fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_owned(),
            host: "127.0.0.1".to_owned(),
            port: 0,
            access_token_secret: "access-secret".to_owned(),
            access_token_expiry: Duration::from_secs(60),
            refresh_token_secret: "refresh-secret".to_owned(),
            refresh_token_expiry: Duration::from_secs(600),
            cors_origin: None,
            upload_dir: PathBuf::from("./public/temp"),
            cookie_secure: false,
            cloudinary: None,
            media_timeout: Duration::from_secs(5),
        }
    }

    fn user() -> User {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        User {
            id: 7,
            username: "ada".to_owned(),
            email: "ada@example.com".to_owned(),
            fullname: String::new(),
            avatar: None,
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let config = config();
        let token = generate_access_token(&config, &user()).unwrap();
        assert_eq!(verify_access_token(&config, &token).unwrap(), 7);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let config = config();
        let refresh = generate_refresh_token(&config, 7).unwrap();
        assert!(matches!(
            verify_access_token(&config, &refresh),
            Err(RequestError::NotAuthorized(_))
        ));
        assert_eq!(verify_refresh_token(&config, &refresh).unwrap(), 7);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let config = config();
        let first = generate_refresh_token(&config, 7).unwrap();
        let second = generate_refresh_token(&config, 7).unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password_argon2("hunter22".to_owned()).await.unwrap();
        assert!(verify_password_argon2("hunter22".to_owned(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_argon2("hunter23".to_owned(), hash)
            .await
            .unwrap());
    }
}
