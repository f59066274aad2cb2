use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::auth::Claims;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::identity::{Identity, IdentityProvider};
use crate::mailer::Mailer;
use crate::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use crate::repo::Repo;
use crate::session::{Session, SessionManager};

pub mod admin;
pub mod auth;
pub mod chat;
pub mod ledger;
pub mod live;
pub mod profile;
pub mod requests;
pub mod support;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // identity
            .service(web::resource("/auth/register").route(web::post().to(auth::register)))
            .service(web::resource("/auth/login").route(web::post().to(auth::login)))
            .service(web::resource("/auth/logout").route(web::post().to(auth::logout)))
            .service(web::resource("/auth/password-reset").route(web::post().to(auth::request_password_reset)))
            .service(web::resource("/auth/password-reset/confirm").route(web::post().to(auth::confirm_password_reset)))
            // session & profile
            .service(web::resource("/session").route(web::get().to(profile::current_session)))
            .service(web::resource("/profile").route(web::patch().to(profile::update_profile)))
            .service(web::resource("/profile/settings").route(web::patch().to(profile::update_settings)))
            .service(web::resource("/profile/activity").route(web::get().to(profile::recent_activity)))
            // request board
            .service(
                web::resource("/requests")
                    .route(web::get().to(requests::list_pending))
                    .route(web::post().to(requests::create_request)),
            )
            .service(web::resource("/requests/{id}").route(web::delete().to(requests::delete_request)))
            .service(web::resource("/requests/{id}/offer").route(web::post().to(requests::offer_help)))
            .service(web::resource("/requests/{id}/confirm").route(web::post().to(requests::confirm_receipt)))
            .service(web::resource("/requests/{id}/chat").route(web::post().to(chat::open_room)))
            .service(web::resource("/history/requests").route(web::get().to(requests::my_requests)))
            .service(web::resource("/history/helped").route(web::get().to(requests::my_help)))
            // ledger
            .service(web::resource("/catalog").route(web::get().to(ledger::list_catalog)))
            .service(web::resource("/redemptions").route(web::post().to(ledger::redeem)))
            .service(web::resource("/history/redemptions").route(web::get().to(ledger::my_redemptions)))
            // chat
            .service(web::resource("/chats").route(web::get().to(chat::list_rooms)))
            .service(
                web::resource("/chats/{id}/messages")
                    .route(web::get().to(chat::list_messages))
                    .route(web::post().to(chat::send_message)),
            )
            // support
            .service(
                web::resource("/support/messages")
                    .route(web::get().to(support::my_messages))
                    .route(web::post().to(support::send)),
            )
            // admin console
            .service(web::resource("/admin/profiles").route(web::get().to(admin::list_profiles)))
            .service(web::resource("/admin/profiles/{uid}").route(web::patch().to(admin::update_profile)))
            .service(web::resource("/admin/profiles/{uid}/password-reset").route(web::post().to(admin::send_password_reset)))
            .service(web::resource("/admin/support").route(web::get().to(admin::list_threads)))
            .service(
                web::resource("/admin/support/{uid}/messages")
                    .route(web::get().to(admin::thread_messages))
                    .route(web::post().to(admin::reply)),
            )
            .service(web::resource("/admin/redemptions").route(web::get().to(admin::list_redemptions)))
            // live queries (server-sent events)
            .service(web::resource("/live/requests").route(web::get().to(live::requests)))
            .service(web::resource("/live/chats").route(web::get().to(live::rooms)))
            .service(web::resource("/live/chats/{id}").route(web::get().to(live::room_messages)))
            .service(web::resource("/live/support").route(web::get().to(live::support)))
            .service(web::resource("/admin/live/profiles").route(web::get().to(live::admin_profiles)))
            .service(web::resource("/admin/live/support").route(web::get().to(live::admin_support))),
    );
    cfg.route("/healthz", web::get().to(healthz));
    cfg.route("/metrics", web::get().to(crate::telemetry::metrics_endpoint));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub identity: Arc<dyn IdentityProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub sessions: SessionManager,
    pub rate_limiter: Option<RateLimiterFacade>,
    /// Base of links sent by mail.
    pub frontend_url: String,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repo>,
        identity: Arc<dyn IdentityProvider>,
        mailer: Arc<dyn Mailer>,
        cfg: &AppConfig,
    ) -> Self {
        let rate_limiter = cfg.rate_limit_enabled.then(|| {
            RateLimiterFacade::new(InMemoryRateLimiter::new(true), RateLimitConfig::from_env())
        });
        Self {
            repo,
            identity,
            mailer,
            sessions: SessionManager::new(cfg.admin_emails.clone(), cfg.jwt_ttl()),
            rate_limiter,
            frontend_url: cfg.frontend_url.clone(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiterFacade>) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// Session for an authenticated caller, creating the profile if it is missing.
    pub(crate) async fn session_for(&self, claims: &Claims) -> Result<Session, ApiError> {
        let identity = Identity { uid: claims.sub.clone(), email: claims.email.clone() };
        Ok(self.sessions.load(self.repo.as_ref(), &identity).await?)
    }
}

pub(crate) fn check_request_rate(state: &AppState, uid: &str) -> Result<(), ApiError> {
    match &state.rate_limiter {
        Some(rl) if !rl.allow_request(uid) => {
            tracing::warn!(%uid, "request creation rate limited");
            Err(ApiError::TooManyRequests)
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_message_rate(state: &AppState, uid: &str) -> Result<(), ApiError> {
    match &state.rate_limiter {
        Some(rl) if !rl.allow_message(uid) => {
            tracing::warn!(%uid, "message rate limited");
            Err(ApiError::TooManyRequests)
        }
        _ => Ok(()),
    }
}

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Process is up")))]
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}
