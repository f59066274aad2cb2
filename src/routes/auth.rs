use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AppState;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::identity::IdentityError;
use crate::lifecycle::{self, SIGNUP_BONUS};
use crate::mailer::{reset_link, MailError};
use crate::session::{default_profile, Session};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub age: u8,
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub session: Session,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

fn signed_in(state: &AppState, session: Session) -> Result<AuthResponse, ApiError> {
    let token = state.sessions.issue_token(&session).map_err(|e| {
        tracing::error!(error = %e, "token signing failed");
        ApiError::Internal
    })?;
    Ok(AuthResponse { token, session })
}

pub(crate) fn mail_failed(e: MailError) -> ApiError {
    tracing::error!(error = %e, "password reset mail not delivered");
    ApiError::Internal
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account and profile created", body = AuthResponse),
        (status = 400, description = "Invalid age, address, email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(data: web::Data<AppState>, payload: web::Json<RegisterRequest>) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    lifecycle::validate_age(body.age)?;
    let address = body.address.trim();
    if address.is_empty() {
        return Err(ApiError::BadRequest("address is required".into()));
    }
    let identity = data.identity.create_account(&body.email, &body.password).await?;
    let mut profile = default_profile(&identity);
    profile.age = Some(body.age);
    profile.address = Some(address.to_string());
    data.repo.create_profile(profile).await?;
    let session = data.sessions.load(data.repo.as_ref(), &identity).await?;
    tracing::info!(uid = %identity.uid, bonus = SIGNUP_BONUS, "member registered");
    Ok(HttpResponse::Created().json(signed_in(&data, session)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let identity = data.identity.sign_in(&payload.email, &payload.password).await?;
    let session = data.sessions.load(data.repo.as_ref(), &identity).await?;
    tracing::info!(uid = %identity.uid, role = ?session.role, "signed in");
    Ok(HttpResponse::Ok().json(signed_in(&data, session)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses((status = 204, description = "Token revoked"), (status = 401, description = "Not signed in"))
)]
pub async fn logout(auth: Auth, data: web::Data<AppState>) -> HttpResponse {
    data.sessions.revoke(&auth.0);
    tracing::info!(uid = %auth.0.sub, "signed out");
    HttpResponse::NoContent().finish()
}

/// Always 202 so the endpoint does not reveal which emails are registered.
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset",
    tag = "auth",
    request_body = PasswordResetRequest,
    responses((status = 202, description = "Reset mail sent if the account exists"))
)]
pub async fn request_password_reset(
    data: web::Data<AppState>,
    payload: web::Json<PasswordResetRequest>,
) -> Result<HttpResponse, ApiError> {
    match data.identity.issue_password_reset(&payload.email).await {
        Ok(token) => {
            let link = reset_link(&data.frontend_url, &token);
            data.mailer.send_password_reset(payload.email.trim(), &link).await.map_err(mail_failed)?;
            tracing::info!("password reset dispatched");
        }
        Err(IdentityError::NotFound | IdentityError::InvalidEmail) => {
            tracing::info!("password reset for unknown email ignored");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(HttpResponse::Accepted().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    tag = "auth",
    request_body = PasswordResetConfirm,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Token invalid or expired, or password too short")
    )
)]
pub async fn confirm_password_reset(
    data: web::Data<AppState>,
    payload: web::Json<PasswordResetConfirm>,
) -> Result<HttpResponse, ApiError> {
    let identity = data.identity.confirm_password_reset(&payload.token, &payload.new_password).await?;
    tracing::info!(uid = %identity.uid, "password reset completed");
    Ok(HttpResponse::NoContent().finish())
}
