//! Help request lifecycle.
//!
//! `pending --offer--> fulfilled --confirm--> completed`, plus
//! `pending --owner delete--> (removed)`. Every check here is pure; the store
//! calls them while holding its write guard so check and write are one step.

use chrono::{DateTime, Utc};

use crate::models::{HelpRequest, NewHelpRequest, Profile, RequestStatus};

/// Balance granted to a freshly created profile.
pub const SIGNUP_BONUS: i64 = 10;
/// Reward paid to the helper when the requester confirms receipt.
pub const REQUEST_REWARD: i64 = 5;
pub const CATEGORIES: &[&str] = &["food", "clothing", "books"];
pub const DEFAULT_PICKUP_POINT: &str = "bilik_pengawas";
pub const PRIVATE_PHONE: &str = "Contact Private";
pub const MIN_AGE: u8 = 12;
pub const MAX_AGE: u8 = 20;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("you cannot fulfill your own request")]
    SelfFulfillment,
    #[error("only the requester may do this")]
    NotOwner,
    #[error("not a participant of this chat")]
    NotParticipant,
    #[error("request cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },
    #[error("request is already {0:?}")]
    NotPending(RequestStatus),
    #[error("insufficient points: balance {balance}, cost {cost}")]
    InsufficientPoints { balance: i64, cost: i64 },
    #[error("{0}")]
    Invalid(String),
}

impl RequestStatus {
    /// The only forward edges of the state machine.
    pub fn can_advance_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Fulfilled)
                | (RequestStatus::Fulfilled, RequestStatus::Completed)
        )
    }

    fn advance(self, next: RequestStatus) -> Result<RequestStatus, RuleViolation> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(RuleViolation::InvalidTransition { from: self, to: next })
        }
    }
}

pub fn validate_age(age: u8) -> Result<(), RuleViolation> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(RuleViolation::Invalid(format!("age must be between {MIN_AGE} and {MAX_AGE}")))
    }
}

fn required(field: &str, value: &str) -> Result<(), RuleViolation> {
    if value.trim().is_empty() {
        return Err(RuleViolation::Invalid(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_new_request(new: &NewHelpRequest) -> Result<(), RuleViolation> {
    required("name", &new.name)?;
    required("address", &new.address)?;
    required("category", &new.category)?;
    required("description", &new.description)?;
    if !CATEGORIES.contains(&new.category.as_str()) {
        return Err(RuleViolation::Invalid(format!("unknown category '{}'", new.category)));
    }
    Ok(())
}

/// Builds the pending board entry for `requester`. The caller assigns id and timestamp.
pub fn build_request(
    id: String,
    requester: &Profile,
    new: NewHelpRequest,
    now: DateTime<Utc>,
) -> Result<HelpRequest, RuleViolation> {
    validate_new_request(&new)?;
    Ok(HelpRequest {
        id,
        user_id: requester.uid.clone(),
        user_name: requester.display_name.clone(),
        user_email: requester.email.clone(),
        name: new.name.trim().to_string(),
        address: new.address.trim().to_string(),
        age: requester.age,
        phone: requester
            .phone
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| PRIVATE_PHONE.to_string()),
        category: new.category,
        description: new.description.trim().to_string(),
        urgency: new.urgency,
        pickup_point: new
            .pickup_point
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PICKUP_POINT.to_string()),
        status: RequestStatus::Pending,
        fulfilled_by: None,
        fulfilled_by_name: None,
        created_at: now,
        fulfilled_at: None,
        completed_at: None,
        points: REQUEST_REWARD,
    })
}

pub fn apply_offer(
    req: &mut HelpRequest,
    helper_id: &str,
    helper_name: &str,
    now: DateTime<Utc>,
) -> Result<(), RuleViolation> {
    if req.user_id == helper_id {
        return Err(RuleViolation::SelfFulfillment);
    }
    req.status = req.status.advance(RequestStatus::Fulfilled)?;
    req.fulfilled_by = Some(helper_id.to_string());
    req.fulfilled_by_name = Some(helper_name.to_string());
    req.fulfilled_at = Some(now);
    Ok(())
}

/// Marks the request completed and returns the helper to credit.
/// A replayed confirmation fails the transition check and credits nobody.
pub fn apply_completion(
    req: &mut HelpRequest,
    requester_id: &str,
    now: DateTime<Utc>,
) -> Result<String, RuleViolation> {
    if req.user_id != requester_id {
        return Err(RuleViolation::NotOwner);
    }
    let next = req.status.advance(RequestStatus::Completed)?;
    let helper = req
        .fulfilled_by
        .clone()
        .ok_or_else(|| RuleViolation::Invalid("request has no helper".into()))?;
    req.status = next;
    req.completed_at = Some(now);
    Ok(helper)
}

pub fn check_delete(req: &HelpRequest, owner_id: &str) -> Result<(), RuleViolation> {
    if req.user_id != owner_id {
        return Err(RuleViolation::NotOwner);
    }
    if req.status != RequestStatus::Pending {
        return Err(RuleViolation::NotPending(req.status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Settings, Urgency};

    fn member(uid: &str) -> Profile {
        Profile {
            uid: uid.into(),
            email: format!("{uid}@example.com"),
            display_name: uid.into(),
            points: SIGNUP_BONUS,
            phone: None,
            address: Some("Jalan 1".into()),
            age: Some(15),
            is_admin: false,
            settings: Settings::default(),
        }
    }

    fn form() -> NewHelpRequest {
        NewHelpRequest {
            name: "Aisyah".into(),
            address: "Lot 12".into(),
            category: "books".into(),
            description: "Form 4 science textbook".into(),
            urgency: Urgency::High,
            pickup_point: None,
        }
    }

    #[test]
    fn only_forward_edges_allowed() {
        use RequestStatus::*;
        assert!(Pending.can_advance_to(Fulfilled));
        assert!(Fulfilled.can_advance_to(Completed));
        for (a, b) in [(Fulfilled, Pending), (Completed, Fulfilled), (Completed, Pending), (Pending, Completed), (Pending, Pending)] {
            assert!(!a.can_advance_to(b), "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn build_fills_defaults_from_profile() {
        let req = build_request("r1".into(), &member("b"), form(), Utc::now()).unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.points, REQUEST_REWARD);
        assert_eq!(req.phone, PRIVATE_PHONE);
        assert_eq!(req.pickup_point, DEFAULT_PICKUP_POINT);
        assert_eq!(req.age, Some(15));
    }

    #[test]
    fn submitted_age_is_ignored() {
        let form: NewHelpRequest = serde_json::from_value(serde_json::json!({
            "name": "Aisyah",
            "address": "Lot 12",
            "age": 40,
            "category": "books",
            "description": "Form 4 science textbook"
        }))
        .unwrap();
        let req = build_request("r".into(), &member("b"), form, Utc::now()).unwrap();
        assert_eq!(req.age, Some(15));
    }

    #[test]
    fn build_rejects_missing_fields_and_unknown_category() {
        let mut f = form();
        f.description = "   ".into();
        assert!(matches!(build_request("r".into(), &member("b"), f, Utc::now()), Err(RuleViolation::Invalid(_))));
        let mut f = form();
        f.category = "toys".into();
        assert!(build_request("r".into(), &member("b"), f, Utc::now()).is_err());
    }

    #[test]
    fn self_fulfillment_rejected() {
        let mut req = build_request("r".into(), &member("b"), form(), Utc::now()).unwrap();
        assert_eq!(apply_offer(&mut req, "b", "b", Utc::now()), Err(RuleViolation::SelfFulfillment));
        assert_eq!(req.status, RequestStatus::Pending);
    }

    #[test]
    fn completion_requires_fulfilled_and_owner() {
        let mut req = build_request("r".into(), &member("b"), form(), Utc::now()).unwrap();
        assert!(matches!(apply_completion(&mut req, "b", Utc::now()), Err(RuleViolation::InvalidTransition { .. })));
        apply_offer(&mut req, "c", "Chong", Utc::now()).unwrap();
        assert_eq!(apply_completion(&mut req, "c", Utc::now()), Err(RuleViolation::NotOwner));
        assert_eq!(apply_completion(&mut req, "b", Utc::now()).unwrap(), "c");
        // replay
        assert!(apply_completion(&mut req, "b", Utc::now()).is_err());
    }

    #[test]
    fn delete_only_pending_by_owner() {
        let mut req = build_request("r".into(), &member("b"), form(), Utc::now()).unwrap();
        assert_eq!(check_delete(&req, "c"), Err(RuleViolation::NotOwner));
        assert!(check_delete(&req, "b").is_ok());
        apply_offer(&mut req, "c", "Chong", Utc::now()).unwrap();
        assert_eq!(check_delete(&req, "b"), Err(RuleViolation::NotPending(RequestStatus::Fulfilled)));
    }

    #[test]
    fn age_window() {
        assert!(validate_age(11).is_err());
        assert!(validate_age(12).is_ok());
        assert!(validate_age(20).is_ok());
        assert!(validate_age(21).is_err());
    }
}
