/// JWT token generation and validation module
///
/// Two token kinds are issued, each signed with its own HS256 secret:
///
/// - **Access token**: short-lived (default 15 minutes). Carries the user id,
///   email, username and full name.
/// - **Refresh token**: long-lived (default 7 days). Carries only the user id
///   and is persisted on the user record so that it can be rotated and
///   revoked.
///
/// Every token gets a random `jti`, so two tokens minted for the same user in
/// the same second still differ.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use vidhub_shared::auth::jwt::{TokenConfig, TokenIssuer};
///
/// let issuer = TokenIssuer::new(TokenConfig {
///     access_secret: "access-secret-at-least-32-bytes-long!!".to_string(),
///     access_expiry: Duration::minutes(15),
///     refresh_secret: "refresh-secret-at-least-32-bytes-long!".to_string(),
///     refresh_expiry: Duration::days(7),
/// });
///
/// assert_eq!(issuer.access_expiry(), Duration::minutes(15));
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Value of the `iss` claim
pub const ISSUER: &str = "vidhub";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Bad signature, malformed token, wrong issuer or wrong token type
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Any other verification failure (key problems, crypto backend)
    #[error("Failed to validate token: {0}")]
    Other(String),

    /// Unparseable expiry setting
    #[error("Invalid token expiry '{0}'")]
    InvalidExpiry(String),
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims of an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - User ID
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

/// Claims of a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject - User ID
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

impl AccessClaims {
    /// Creates access claims for `user`, expiring after `expires_in`
    pub fn for_user(user: &User, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        }
    }
}

impl RefreshClaims {
    /// Creates refresh claims for `user_id`, expiring after `expires_in`
    pub fn for_user(user_id: Uuid, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Refresh,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Secrets and lifetimes for both token kinds
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_expiry: Duration,
    pub refresh_secret: String,
    pub refresh_expiry: Duration,
}

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies tokens with the configured secrets
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn access_expiry(&self) -> Duration {
        self.config.access_expiry
    }

    pub fn refresh_expiry(&self) -> Duration {
        self.config.refresh_expiry
    }

    /// Signs a new access token and a new refresh token for `user`
    ///
    /// Persisting the refresh token is the caller's job.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, JwtError> {
        let access = AccessClaims::for_user(user, self.config.access_expiry);
        let refresh = RefreshClaims::for_user(user.id, self.config.refresh_expiry);

        Ok(TokenPair {
            access_token: create_token(&access, &self.config.access_secret)?,
            refresh_token: create_token(&refresh, &self.config.refresh_secret)?,
        })
    }

    /// Validates an access token
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = validate_token(token, &self.config.access_secret)?;

        if claims.token_type != TokenType::Access {
            return Err(JwtError::Invalid(format!(
                "Expected access token, got {} token",
                claims.token_type.as_str()
            )));
        }

        Ok(claims)
    }

    /// Validates a refresh token
    ///
    /// Only signature, expiry and type are checked here; comparing against the
    /// persisted token happens at the call site.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = validate_token(token, &self.config.refresh_secret)?;

        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::Invalid(format!(
                "Expected refresh token, got {} token",
                claims.token_type.as_str()
            )));
        }

        Ok(claims)
    }
}

/// Signs `claims` with HS256
pub fn create_token<C: Serialize>(claims: &C, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Decodes and verifies a token: signature, `exp`, `nbf` and issuer
pub fn validate_token<C: DeserializeOwned>(token: &str, secret: &str) -> Result<C, JwtError> {
    use jsonwebtoken::errors::ErrorKind;

    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<C>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => JwtError::Invalid(e.to_string()),
        _ => JwtError::Other(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Parses an expiry setting such as `15m`, `7d`, `12h`, `30s` or `3600`
///
/// A bare number is read as seconds.
pub fn parse_expiry(value: &str) -> Result<Duration, JwtError> {
    let value = value.trim();
    let invalid = || JwtError::InvalidExpiry(value.to_string());

    let (number, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        Some(_) => (value, None),
        None => return Err(invalid()),
    };

    let amount: i64 = number.trim().parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    match unit {
        None | Some('s') => Ok(Duration::seconds(amount)),
        Some('m') => Ok(Duration::minutes(amount)),
        Some('h') => Ok(Duration::hours(amount)),
        Some('d') => Ok(Duration::days(amount)),
        Some('w') => Ok(Duration::weeks(amount)),
        Some(_) => Err(invalid()),
    }
}
