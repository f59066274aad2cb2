use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document ids are opaque strings (uuid v4 for generated ones, auth uid for profiles).
pub type Id = String;

// ---------------------------------------------------------------- profiles

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub auto_share_contact: bool,
    pub receive_notifications: bool,
    pub share_location: bool,
    pub profile_visibility: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_share_contact: true,
            receive_notifications: true,
            share_location: true,
            profile_visibility: "public".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: Id,
    pub email: String,
    pub display_name: String,
    /// Doubles as the points ledger: there is no separate balance entity.
    pub points: i64,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub age: Option<u8>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub settings: Settings,
}

/// Member self-edit of the profile page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: String,
    pub age: u8,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Admin console edit: direct overwrite, no audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfileUpdate {
    pub display_name: Option<String>,
    pub points: Option<i64>,
}

// ---------------------------------------------------------------- requests

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Default for Urgency {
    fn default() -> Self { Urgency::Medium }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Fulfilled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub id: Id,
    pub user_id: Id,
    pub user_name: String,
    pub user_email: String,
    pub name: String,
    pub address: String,
    pub age: Option<u8>,
    pub phone: String,
    pub category: String,
    pub description: String,
    pub urgency: Urgency,
    pub pickup_point: String,
    pub status: RequestStatus,
    pub fulfilled_by: Option<Id>,
    pub fulfilled_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Reward tag paid to the helper on completion.
    pub points: i64,
}

/// Request form as submitted by a member; requester identity and age come
/// from the registered profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewHelpRequest {
    pub name: String,
    pub address: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub pickup_point: Option<String>,
}

// ---------------------------------------------------------------- ledger

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub cost: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RedeemStatus {
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRecord {
    pub id: Id,
    pub user_id: Id,
    pub user_name: String,
    pub full_name: String,
    pub user_class: String,
    pub item_name: String,
    pub item_points: i64,
    pub status: RedeemStatus,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemForm {
    pub item_id: String,
    pub full_name: String,
    pub user_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub record: RedeemRecord,
    pub balance: i64,
}

// ---------------------------------------------------------------- chat

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: Id,
    pub request_id: Id,
    pub request_category: String,
    pub request_name: String,
    pub participants: Vec<Id>,
    pub participant_names: Vec<String>,
    pub last_message: Option<String>,
    pub last_sender_id: Option<Id>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Id,
    pub sender_id: Id,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMessage {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupportThread {
    pub user_id: Id,
    pub user_name: String,
    pub user_email: String,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomList {
    pub rooms: Vec<ChatRoom>,
    pub unread: usize,
}
