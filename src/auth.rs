use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};
use utoipa::ToSchema;

use crate::routes::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Token id, used to revoke on sign-out.
    pub jti: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| matches!(r, Role::Admin))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("JWT_SECRET not set")]
    MissingSecret,
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

fn secret() -> Result<String, AuthError> {
    env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)
}

/// Validate a JWT and return its claims.
pub fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Extractor yielding validated, unrevoked `Claims`.
pub struct Auth(pub Claims);

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() else {
            return ready(Err(actix_web::error::ErrorUnauthorized("Authorization required")));
        };
        let claims = match decode_jwt(bearer.token()) {
            Ok(c) => c,
            Err(_) => return ready(Err(actix_web::error::ErrorUnauthorized("Invalid JWT"))),
        };
        let revoked = req
            .app_data::<web::Data<AppState>>()
            .map(|s| s.sessions.is_revoked(&claims.jti))
            .unwrap_or(false);
        if revoked {
            return ready(Err(actix_web::error::ErrorUnauthorized("Signed out")));
        }
        ready(Ok(Auth(claims)))
    }
}

/// Role guard for handlers; works in handlers returning `ApiError` or `actix_web::Error`.
#[macro_export]
macro_rules! require_role {
    ($auth:expr, $role:pat) => {
        if !$auth.0.roles.iter().any(|r| matches!(r, $role)) {
            return Err($crate::error::ApiError::Forbidden("insufficient role".into()).into());
        }
    };
}

/// Create a signed token for `uid`, valid for `ttl`.
pub fn create_jwt(
    uid: &str,
    email: &str,
    roles: Vec<Role>,
    ttl: chrono::Duration,
) -> Result<(String, Claims), AuthError> {
    let secret = secret()?;
    let expiration = (chrono::Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: uid.to_string(),
        email: email.to_string(),
        roles,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expiration,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?;
    Ok((token, claims))
}
