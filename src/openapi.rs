use crate::auth::Role;
use crate::error::ApiErrorBody;
use crate::models::*;
use crate::routes::auth::{AuthResponse, LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest};
use crate::routes::profile::SessionView;
use crate::session::Session;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::healthz,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::request_password_reset,
        crate::routes::auth::confirm_password_reset,
        crate::routes::profile::current_session,
        crate::routes::profile::update_profile,
        crate::routes::profile::update_settings,
        crate::routes::profile::recent_activity,
        crate::routes::requests::list_pending,
        crate::routes::requests::create_request,
        crate::routes::requests::offer_help,
        crate::routes::requests::confirm_receipt,
        crate::routes::requests::delete_request,
        crate::routes::requests::my_requests,
        crate::routes::requests::my_help,
        crate::routes::ledger::list_catalog,
        crate::routes::ledger::redeem,
        crate::routes::ledger::my_redemptions,
        crate::routes::chat::open_room,
        crate::routes::chat::list_rooms,
        crate::routes::chat::list_messages,
        crate::routes::chat::send_message,
        crate::routes::support::my_messages,
        crate::routes::support::send,
        crate::routes::admin::list_profiles,
        crate::routes::admin::update_profile,
        crate::routes::admin::send_password_reset,
        crate::routes::admin::list_threads,
        crate::routes::admin::thread_messages,
        crate::routes::admin::reply,
        crate::routes::admin::list_redemptions,
        crate::routes::live::requests,
        crate::routes::live::rooms,
        crate::routes::live::room_messages,
        crate::routes::live::support,
        crate::routes::live::admin_profiles,
        crate::routes::live::admin_support,
    ),
    components(schemas(
        Profile, Settings, ProfileUpdate, AdminProfileUpdate,
        HelpRequest, NewHelpRequest, Urgency, RequestStatus,
        CatalogItem, RedeemForm, RedeemRecord, RedeemStatus, Redemption,
        ChatRoom, ChatMessage, NewMessage, SupportThread, RoomList,
        Role, Session, SessionView, ApiErrorBody,
        RegisterRequest, LoginRequest, AuthResponse, PasswordResetRequest, PasswordResetConfirm,
    )),
    tags(
        (name = "auth", description = "Registration, sign-in and password reset"),
        (name = "profile", description = "Current session and profile self-service"),
        (name = "requests", description = "Help request board"),
        (name = "history", description = "Per-member history views"),
        (name = "ledger", description = "Points catalog and redemptions"),
        (name = "chat", description = "Requester/helper chat rooms"),
        (name = "support", description = "Member to admin support channel"),
        (name = "admin", description = "Admin console"),
        (name = "live", description = "Server-sent event streams"),
    )
)]
pub struct ApiDoc;
