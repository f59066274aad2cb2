use actix_web::{web, HttpResponse};

use super::{check_request_rate, AppState};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Id, NewHelpRequest};
use crate::telemetry;

#[utoipa::path(
    get,
    path = "/api/v1/requests",
    tag = "requests",
    responses((status = 200, description = "Pending requests, newest first", body = [HelpRequest]))
)]
pub async fn list_pending(_auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_pending_requests().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests",
    tag = "requests",
    request_body = NewHelpRequest,
    responses(
        (status = 201, description = "Request posted", body = HelpRequest),
        (status = 400, description = "Missing field or unknown category"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn create_request(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewHelpRequest>,
) -> Result<HttpResponse, ApiError> {
    check_request_rate(&data, &auth.0.sub)?;
    let req = data.repo.create_request(&auth.0.sub, payload.into_inner()).await?;
    telemetry::request_created();
    tracing::info!(id = %req.id, user = %req.user_id, category = %req.category, "help request created");
    Ok(HttpResponse::Created().json(req))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/offer",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Caller is now the helper", body = HelpRequest),
        (status = 403, description = "Cannot help with your own request"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn offer_help(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let req = data.repo.offer_help(&path.into_inner(), &auth.0.sub).await?;
    tracing::info!(id = %req.id, helper = %auth.0.sub, "help offered");
    Ok(HttpResponse::Ok().json(req))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/confirm",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Completed; helper credited", body = HelpRequest),
        (status = 403, description = "Only the requester can confirm"),
        (status = 409, description = "Request is not awaiting confirmation")
    )
)]
pub async fn confirm_receipt(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let req = data.repo.confirm_receipt(&path.into_inner(), &auth.0.sub).await?;
    telemetry::request_completed();
    tracing::info!(id = %req.id, helper = ?req.fulfilled_by, points = req.points, "help completed");
    Ok(HttpResponse::Ok().json(req))
}

#[utoipa::path(
    delete,
    path = "/api/v1/requests/{id}",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 204, description = "Request and history entry removed"),
        (status = 403, description = "Not your request"),
        (status = 409, description = "Someone already offered help")
    )
)]
pub async fn delete_request(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    data.repo.delete_request(&id, &auth.0.sub).await?;
    tracing::info!(%id, "help request withdrawn");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/history/requests",
    tag = "history",
    responses((status = 200, description = "Requests the caller posted", body = [HelpRequest]))
)]
pub async fn my_requests(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.history_for_requester(&auth.0.sub, None).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/history/helped",
    tag = "history",
    responses((status = 200, description = "Requests the caller helped with", body = [HelpRequest]))
)]
pub async fn my_help(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.history_for_helper(&auth.0.sub).await?))
}
