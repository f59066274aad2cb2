//! Admin console. Every handler requires the admin role claim.

use actix_web::{web, HttpResponse};

use super::auth::mail_failed;
use super::AppState;
use crate::auth::{Auth, Role};
use crate::error::ApiError;
use crate::mailer::reset_link;
use crate::models::{AdminProfileUpdate, NewMessage};
use crate::require_role;
use crate::telemetry::{self, Channel};

#[utoipa::path(
    get,
    path = "/api/v1/admin/profiles",
    tag = "admin",
    responses((status = 200, description = "All member profiles", body = [Profile]), (status = 403, description = "Admins only"))
)]
pub async fn list_profiles(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    Ok(HttpResponse::Ok().json(data.repo.list_profiles().await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/profiles/{uid}",
    tag = "admin",
    params(("uid" = String, Path, description = "Member uid")),
    request_body = AdminProfileUpdate,
    responses(
        (status = 200, description = "Profile overwritten", body = Profile),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such member")
    )
)]
pub async fn update_profile(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<AdminProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let uid = path.into_inner();
    let upd = payload.into_inner();
    tracing::info!(admin = %auth.0.sub, member = %uid, points = ?upd.points, "admin profile edit");
    Ok(HttpResponse::Ok().json(data.repo.admin_update_profile(&uid, upd).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/profiles/{uid}/password-reset",
    tag = "admin",
    params(("uid" = String, Path, description = "Member uid")),
    responses(
        (status = 202, description = "Reset mail sent to the member's registered email"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such account")
    )
)]
pub async fn send_password_reset(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let identity = data.identity.find_by_uid(&path.into_inner()).await?;
    let token = data.identity.issue_password_reset(&identity.email).await?;
    let link = reset_link(&data.frontend_url, &token);
    data.mailer.send_password_reset(&identity.email, &link).await.map_err(mail_failed)?;
    tracing::info!(admin = %auth.0.sub, member = %identity.uid, "admin sent password reset");
    Ok(HttpResponse::Accepted().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/support",
    tag = "admin",
    responses((status = 200, description = "Support threads, most recent first", body = [SupportThread]))
)]
pub async fn list_threads(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    Ok(HttpResponse::Ok().json(data.repo.support_threads().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/support/{uid}/messages",
    tag = "admin",
    params(("uid" = String, Path, description = "Member uid")),
    responses(
        (status = 200, description = "Conversation with one member", body = [ChatMessage]),
        (status = 404, description = "Member has no support thread")
    )
)]
pub async fn thread_messages(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let uid = path.into_inner();
    data.repo.support_thread(&uid).await?;
    Ok(HttpResponse::Ok().json(data.repo.support_messages(&uid).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/support/{uid}/messages",
    tag = "admin",
    params(("uid" = String, Path, description = "Member uid")),
    request_body = NewMessage,
    responses(
        (status = 201, description = "Reply sent as Administrator", body = ChatMessage),
        (status = 404, description = "Member has no support thread")
    )
)]
pub async fn reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NewMessage>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let msg = data.repo.admin_reply(&path.into_inner(), &auth.0.sub, &payload.text).await?;
    telemetry::message_sent(Channel::Support);
    Ok(HttpResponse::Created().json(msg))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/redemptions",
    tag = "admin",
    responses((status = 200, description = "Every redemption, newest first", body = [RedeemRecord]))
)]
pub async fn list_redemptions(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    Ok(HttpResponse::Ok().json(data.repo.all_redemptions().await?))
}
