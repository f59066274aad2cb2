use actix_web::{web, HttpResponse};

use super::{check_message_rate, AppState};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::NewMessage;
use crate::telemetry::{self, Channel};

#[utoipa::path(
    get,
    path = "/api/v1/support/messages",
    tag = "support",
    responses((status = 200, description = "Caller's support conversation", body = [ChatMessage]))
)]
pub async fn my_messages(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.support_messages(&auth.0.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/support/messages",
    tag = "support",
    request_body = NewMessage,
    responses(
        (status = 201, description = "Message sent to the admins", body = ChatMessage),
        (status = 400, description = "Empty message"),
        (status = 429, description = "Too many messages")
    )
)]
pub async fn send(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewMessage>) -> Result<HttpResponse, ApiError> {
    check_message_rate(&data, &auth.0.sub)?;
    let msg = data.repo.member_send(&auth.0.sub, &payload.text).await?;
    telemetry::message_sent(Channel::Support);
    tracing::debug!(user = %auth.0.sub, "support message sent");
    Ok(HttpResponse::Created().json(msg))
}
