#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App};
use carehub::identity::InMemIdentity;
use carehub::mailer::LogMailer;
use carehub::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use carehub::repo::inmem::InMemRepo;
use carehub::session::Session;
use carehub::{config, AppConfig, AppState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use carehub::identity::IdentityProvider;

fn ensure_secret() {
    std::env::set_var("JWT_SECRET", "testsecret-abcdefghijklmnopqrstuvwxyz012345");
}

fn limited_state() -> web::Data<AppState> {
    let cfg = RateLimitConfig {
        request_limit: 1,
        request_window: Duration::from_secs(300),
        message_limit: 2,
        message_window: Duration::from_secs(60),
    };
    let limiter = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
    web::Data::new(
        AppState::new(
            Arc::new(InMemRepo::ephemeral()),
            Arc::new(InMemIdentity::ephemeral()),
            Arc::new(LogMailer),
            &AppConfig::default(),
        )
        .with_rate_limiter(Some(limiter)),
    )
}

async fn token_for(state: &AppState, email: &str) -> String {
    let identity = state.identity.create_account(email, "password1").await.unwrap();
    let session: Session = state.sessions.load(state.repo.as_ref(), &identity).await.unwrap();
    state.sessions.issue_token(&session).unwrap()
}

#[actix_web::test]
#[serial_test::serial]
async fn rate_limit_request_creation() {
    ensure_secret();
    let state = limited_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
    let user = token_for(&state, "u@example.com").await;
    let other = token_for(&state, "o@example.com").await;

    let create = |token: &str| {
        test::TestRequest::post()
            .uri("/api/v1/requests")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({"name": "Ali", "address": "Blok D", "category": "food", "description": "Bread"}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, create(&user)).await.status(), 201, "first request allowed");
    assert_eq!(test::call_service(&app, create(&user)).await.status(), 429, "second request should be rate limited");
    // limits are per member
    assert_eq!(test::call_service(&app, create(&other)).await.status(), 201);
}

#[actix_web::test]
#[serial_test::serial]
async fn rate_limit_support_messages() {
    ensure_secret();
    let state = limited_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
    let user = token_for(&state, "u@example.com").await;

    let send = || {
        test::TestRequest::post()
            .uri("/api/v1/support/messages")
            .insert_header(("Authorization", format!("Bearer {user}")))
            .set_json(json!({"text": "hello"}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, send()).await.status(), 201);
    assert_eq!(test::call_service(&app, send()).await.status(), 201);
    assert_eq!(test::call_service(&app, send()).await.status(), 429);
}

#[core::prelude::v1::test]
#[serial_test::serial]
fn config_reads_env_overrides() {
    std::env::set_var("RL_REQUEST_LIMIT", "7");
    std::env::set_var("RL_MESSAGE_WINDOW", "15");
    let cfg = RateLimitConfig::from_env();
    std::env::remove_var("RL_REQUEST_LIMIT");
    std::env::remove_var("RL_MESSAGE_WINDOW");
    assert_eq!(cfg.request_limit, 7);
    assert_eq!(cfg.request_window, Duration::from_secs(300));
    assert_eq!(cfg.message_limit, 30);
    assert_eq!(cfg.message_window, Duration::from_secs(15));
}
