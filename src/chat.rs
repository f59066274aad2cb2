//! Chat rooms between a requester and their helper, plus the member/admin
//! support channel. Rooms share the request id so each request has at most one.

use chrono::{DateTime, Utc};

use crate::lifecycle::RuleViolation;
use crate::models::{ChatMessage, ChatRoom, HelpRequest, RequestStatus};

pub const ADMIN_SENDER_NAME: &str = "Administrator";

/// Room shape for `req`; participants are fixed as `[requester, helper]`.
pub fn room_for_request(req: &HelpRequest, caller: &str, now: DateTime<Utc>) -> Result<ChatRoom, RuleViolation> {
    let (helper, helper_name) = match (req.status, &req.fulfilled_by, &req.fulfilled_by_name) {
        (RequestStatus::Pending, _, _) | (_, None, _) => {
            return Err(RuleViolation::Invalid("chat opens once someone offers help".into()))
        }
        (_, Some(id), name) => (id.clone(), name.clone().unwrap_or_default()),
    };
    if caller != req.user_id && caller != helper {
        return Err(RuleViolation::NotParticipant);
    }
    Ok(ChatRoom {
        id: req.id.clone(),
        request_id: req.id.clone(),
        request_category: req.category.clone(),
        request_name: req.name.clone(),
        participants: vec![req.user_id.clone(), helper],
        participant_names: vec![req.user_name.clone(), helper_name],
        last_message: None,
        last_sender_id: None,
        updated_at: now,
    })
}

pub fn is_participant(room: &ChatRoom, uid: &str) -> bool {
    room.participants.iter().any(|p| p == uid)
}

/// Trims and rejects blank input.
pub fn message_text(raw: &str) -> Result<String, RuleViolation> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(RuleViolation::Invalid("message is empty".into()));
    }
    Ok(text.to_string())
}

pub fn message(id: String, sender_id: &str, sender_name: &str, text: String, timestamp: DateTime<Utc>, is_admin: bool) -> ChatMessage {
    ChatMessage {
        id,
        sender_id: sender_id.to_string(),
        sender_name: if is_admin { ADMIN_SENDER_NAME.to_string() } else { sender_name.to_string() },
        text,
        timestamp,
        is_admin,
    }
}

/// Rooms whose most recent message came from someone other than `viewer`.
pub fn unread_count(rooms: &[ChatRoom], viewer: &str) -> usize {
    rooms
        .iter()
        .filter(|r| r.last_sender_id.as_deref().is_some_and(|s| s != viewer))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Urgency;

    fn request(status: RequestStatus, helper: Option<&str>) -> HelpRequest {
        HelpRequest {
            id: "req-1".into(),
            user_id: "b".into(),
            user_name: "Bee".into(),
            user_email: "b@example.com".into(),
            name: "Bee".into(),
            address: "Lot 1".into(),
            age: Some(14),
            phone: "Contact Private".into(),
            category: "food".into(),
            description: "rice".into(),
            urgency: Urgency::Low,
            pickup_point: "bilik_pengawas".into(),
            status,
            fulfilled_by: helper.map(Into::into),
            fulfilled_by_name: helper.map(|h| h.to_uppercase()),
            created_at: Utc::now(),
            fulfilled_at: None,
            completed_at: None,
            points: 5,
        }
    }

    #[test]
    fn room_keyed_by_request_with_fixed_participants() {
        let room = room_for_request(&request(RequestStatus::Fulfilled, Some("c")), "c", Utc::now()).unwrap();
        assert_eq!(room.id, "req-1");
        assert_eq!(room.participants, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(room.participant_names, vec!["Bee".to_string(), "C".to_string()]);
    }

    #[test]
    fn pending_request_has_no_room() {
        assert!(room_for_request(&request(RequestStatus::Pending, None), "b", Utc::now()).is_err());
    }

    #[test]
    fn outsiders_cannot_open() {
        let err = room_for_request(&request(RequestStatus::Completed, Some("c")), "z", Utc::now()).unwrap_err();
        assert_eq!(err, RuleViolation::NotParticipant);
    }

    #[test]
    fn unread_ignores_own_and_silent_rooms() {
        let base = room_for_request(&request(RequestStatus::Fulfilled, Some("c")), "b", Utc::now()).unwrap();
        let mut mine = base.clone();
        mine.last_sender_id = Some("b".into());
        let mut theirs = base.clone();
        theirs.last_sender_id = Some("c".into());
        assert_eq!(unread_count(&[base, mine, theirs], "b"), 1);
    }

    #[test]
    fn admin_messages_use_admin_name() {
        let m = message("m".into(), "adm", "Ida", "hello".into(), Utc::now(), true);
        assert_eq!(m.sender_name, ADMIN_SENDER_NAME);
        assert!(message_text("   ").is_err());
        assert_eq!(message_text(" hi ").unwrap(), "hi");
    }
}
