use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use super::AppState;
use crate::auth::{Auth, Role};
use crate::chat;
use crate::error::ApiError;
use crate::models::{Profile, ProfileUpdate, Settings};

const RECENT_ACTIVITY: usize = 3;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub profile: Profile,
    pub role: Role,
    /// Chat rooms whose last message came from someone else.
    pub unread: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/session",
    tag = "profile",
    responses(
        (status = 200, description = "Signed-in profile, role and unread chat count", body = SessionView),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn current_session(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let session = data.session_for(&auth.0).await?;
    let rooms = data.repo.rooms_for(&session.profile.uid).await?;
    let unread = chat::unread_count(&rooms, &session.profile.uid);
    Ok(HttpResponse::Ok().json(SessionView { profile: session.profile, role: session.role, unread }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/profile",
    tag = "profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Age outside 12..=20 or empty name")
    )
)]
pub async fn update_profile(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.update_profile(&auth.0.sub, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    patch,
    path = "/api/v1/profile/settings",
    tag = "profile",
    request_body = Settings,
    responses((status = 200, description = "Settings saved", body = Profile))
)]
pub async fn update_settings(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<Settings>,
) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.update_settings(&auth.0.sub, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/profile/activity",
    tag = "profile",
    responses((status = 200, description = "Three most recent requests by the caller", body = [HelpRequest]))
)]
pub async fn recent_activity(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let items = data.repo.history_for_requester(&auth.0.sub, Some(RECENT_ACTIVITY)).await?;
    Ok(HttpResponse::Ok().json(items))
}
