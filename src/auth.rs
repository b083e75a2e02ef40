use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` to act as an existing user without a token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the bearer tokens issued by `POST /login/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a decimal string.
    pub sub: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Requester
///
/// Who is making the request. `None` is an anonymous requester, which is
/// valid for read-only actions; handlers decide what anonymous may do.
#[derive(Debug, Clone, Default)]
pub struct Requester(pub Option<AuthUser>);

impl Requester {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl From<AuthUser> for Requester {
    fn from(user: AuthUser) -> Self {
        Self(Some(user))
    }
}

/// issue_token
///
/// Signs an HS256 token for `user` valid for `config.token_ttl_secs`.
pub fn issue_token(config: &AppConfig, user: &AuthUser) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        iat: now,
        exp: now.saturating_add(config.token_ttl_secs as usize),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to encode token: {e}")))
}

/// Validates signature and expiry, returning the claims.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::AuthenticationFailed("Token has expired."),
        _ => ApiError::AuthenticationFailed("Invalid token."),
    })
}

/// Requester extractor
///
/// Resolution order:
/// 1. `Env::Local` only: an `x-user-id` header naming an existing user.
/// 2. `Authorization: Bearer <jwt>`; the subject must still exist.
/// 3. No credentials at all: anonymous.
///
/// Credentials that are present but unusable reject the request with 401,
/// even for reads.
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let dev_id = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i64>().ok());
            if let Some(id) = dev_id {
                if let Some(user) = repo.get_user(id).await? {
                    return Ok(AuthUser {
                        id: user.id,
                        username: user.username,
                    }
                    .into());
                }
            }
        }

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Self::anonymous());
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::AuthenticationFailed("Invalid token header."))?;

        let claims = decode_token(&config, token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ApiError::AuthenticationFailed("Invalid token."))?;

        // The account may have disappeared since the token was issued.
        let user = repo
            .get_user(user_id)
            .await?
            .ok_or(ApiError::AuthenticationFailed("User not found."))?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        }
        .into())
    }
}
