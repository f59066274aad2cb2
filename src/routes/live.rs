//! Live queries as server-sent events.
//!
//! Each stream sends the query result once on connect and again after every
//! committed change to one of its topics. The stream owns a feed
//! [`Subscription`](crate::feed::Subscription); a client disconnect drops the
//! body and with it the subscription.

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::http::header;
use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use futures_util::future::LocalBoxFuture;
use futures_util::{stream, FutureExt};
use serde::Serialize;

use super::chat::room_for_participant;
use super::AppState;
use crate::auth::{Auth, Role};
use crate::chat;
use crate::error::{ApiError, ApiErrorBody};
use crate::feed::Topic;
use crate::models::{Id, RoomList};
use crate::repo::{Repo, RepoError, RepoResult};
use crate::require_role;

fn frame<T: Serialize>(event: Option<&str>, value: &T) -> Bytes {
    let data = serde_json::to_string(value).unwrap_or_else(|_| "null".into());
    match event {
        Some(name) => Bytes::from(format!("event: {name}\ndata: {data}\n\n")),
        None => Bytes::from(format!("data: {data}\n\n")),
    }
}

fn live_query<T, F>(state: &AppState, topics: Vec<Topic>, query: F) -> HttpResponse
where
    T: Serialize + 'static,
    F: Fn(Arc<dyn Repo>) -> LocalBoxFuture<'static, RepoResult<T>> + 'static,
{
    let sub = state.repo.feed().subscribe(topics);
    let repo = state.repo.clone();
    let frames = stream::unfold(Some((sub, repo, query, true)), |st| async move {
        let (mut sub, repo, query, first) = st?;
        if !first {
            sub.changed().await?;
        }
        match query(repo.clone()).await {
            Ok(value) => Some((Ok::<_, Infallible>(frame(None, &value)), Some((sub, repo, query, false)))),
            Err(e) => {
                tracing::error!(error = %e, "live query failed, closing stream");
                let body = ApiErrorBody { error: ApiError::from(e).to_string() };
                Some((Ok(frame(Some("error"), &body)), None))
            }
        }
    });
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        // keep Compress from buffering frames
        .insert_header((header::CONTENT_ENCODING, "identity"))
        .streaming(frames)
}

#[utoipa::path(
    get,
    path = "/api/v1/live/requests",
    tag = "live",
    responses((status = 200, description = "text/event-stream of pending requests"))
)]
pub async fn requests(_auth: Auth, data: web::Data<AppState>) -> HttpResponse {
    live_query(&data, vec![Topic::Requests], |repo| async move { repo.list_pending_requests().await }.boxed_local())
}

#[utoipa::path(
    get,
    path = "/api/v1/live/chats",
    tag = "live",
    responses((status = 200, description = "text/event-stream of the caller's rooms and unread count"))
)]
pub async fn rooms(auth: Auth, data: web::Data<AppState>) -> HttpResponse {
    let uid = auth.0.sub;
    live_query(&data, vec![Topic::ChatRooms], move |repo| {
        let uid = uid.clone();
        async move {
            let rooms = repo.rooms_for(&uid).await?;
            let unread = chat::unread_count(&rooms, &uid);
            Ok::<_, RepoError>(RoomList { rooms, unread })
        }
        .boxed_local()
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/live/chats/{id}",
    tag = "live",
    params(("id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "text/event-stream of the room's messages"),
        (status = 403, description = "Not a participant")
    )
)]
pub async fn room_messages(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let room = room_for_participant(&data, &path.into_inner(), &auth.0.sub).await?;
    let topic = Topic::ChatMessages(room.id.clone());
    Ok(live_query(&data, vec![topic], move |repo| {
        let id = room.id.clone();
        async move { repo.room_messages(&id).await }.boxed_local()
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/live/support",
    tag = "live",
    responses((status = 200, description = "text/event-stream of the caller's support conversation"))
)]
pub async fn support(auth: Auth, data: web::Data<AppState>) -> HttpResponse {
    let uid = auth.0.sub;
    live_query(&data, vec![Topic::SupportMessages(uid.clone())], move |repo| {
        let uid = uid.clone();
        async move { repo.support_messages(&uid).await }.boxed_local()
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/live/profiles",
    tag = "live",
    responses((status = 200, description = "text/event-stream of all profiles"), (status = 403, description = "Admins only"))
)]
pub async fn admin_profiles(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    Ok(live_query(&data, vec![Topic::Profiles], |repo| async move { repo.list_profiles().await }.boxed_local()))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/live/support",
    tag = "live",
    responses((status = 200, description = "text/event-stream of support threads"), (status = 403, description = "Admins only"))
)]
pub async fn admin_support(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    Ok(live_query(&data, vec![Topic::SupportThreads], |repo| async move { repo.support_threads().await }.boxed_local()))
}
