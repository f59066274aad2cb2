use actix_web::{web, HttpResponse};

use super::{check_message_rate, AppState};
use crate::auth::Auth;
use crate::chat;
use crate::error::ApiError;
use crate::lifecycle::RuleViolation;
use crate::models::{ChatRoom, Id, NewMessage, RoomList};
use crate::telemetry::{self, Channel};

/// Room lookup restricted to its two participants.
pub(crate) async fn room_for_participant(data: &AppState, room_id: &str, uid: &str) -> Result<ChatRoom, ApiError> {
    let room = data.repo.get_room(room_id).await?;
    if !chat::is_participant(&room, uid) {
        return Err(RuleViolation::NotParticipant.into());
    }
    Ok(room)
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/chat",
    tag = "chat",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Room for this request, created on first call", body = ChatRoom),
        (status = 400, description = "Nobody has offered help yet"),
        (status = 403, description = "Caller is neither requester nor helper")
    )
)]
pub async fn open_room(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let room = data.repo.open_room(&path.into_inner(), &auth.0.sub).await?;
    Ok(HttpResponse::Ok().json(room))
}

#[utoipa::path(
    get,
    path = "/api/v1/chats",
    tag = "chat",
    responses((status = 200, description = "Caller's rooms, most recent first", body = RoomList))
)]
pub async fn list_rooms(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let rooms = data.repo.rooms_for(&auth.0.sub).await?;
    let unread = chat::unread_count(&rooms, &auth.0.sub);
    Ok(HttpResponse::Ok().json(RoomList { rooms, unread }))
}

#[utoipa::path(
    get,
    path = "/api/v1/chats/{id}/messages",
    tag = "chat",
    params(("id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [ChatMessage]),
        (status = 403, description = "Not a participant")
    )
)]
pub async fn list_messages(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let room = room_for_participant(&data, &path.into_inner(), &auth.0.sub).await?;
    Ok(HttpResponse::Ok().json(data.repo.room_messages(&room.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/chats/{id}/messages",
    tag = "chat",
    params(("id" = String, Path, description = "Room id")),
    request_body = NewMessage,
    responses(
        (status = 201, description = "Message appended", body = ChatMessage),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Not a participant"),
        (status = 429, description = "Too many messages")
    )
)]
pub async fn send_message(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewMessage>,
) -> Result<HttpResponse, ApiError> {
    check_message_rate(&data, &auth.0.sub)?;
    let msg = data.repo.send_message(&path.into_inner(), &auth.0.sub, &payload.text).await?;
    telemetry::message_sent(Channel::Chat);
    Ok(HttpResponse::Created().json(msg))
}
