//! Points ledger. The profile's `points` field is the balance; this module only
//! holds the voucher catalog and the redemption rule applied inside the store
//! transaction.

use chrono::{DateTime, Utc};

use crate::lifecycle::RuleViolation;
use crate::models::{CatalogItem, Profile, RedeemForm, RedeemRecord, RedeemStatus};

const CATALOG: &[(&str, &str, i64)] = &[
    ("1", "RM5 Voucher", 20),
    ("2", "RM10 Voucher", 40),
    ("3", "RM15 Voucher", 50),
];

pub fn catalog() -> Vec<CatalogItem> {
    CATALOG
        .iter()
        .map(|(id, name, cost)| CatalogItem { id: (*id).into(), name: (*name).into(), cost: *cost })
        .collect()
}

pub fn find_item(id: &str) -> Option<CatalogItem> {
    catalog().into_iter().find(|i| i.id == id)
}

pub fn validate_form(form: &RedeemForm) -> Result<(), RuleViolation> {
    if form.full_name.trim().is_empty() || form.user_class.trim().is_empty() {
        return Err(RuleViolation::Invalid("full name and class are required".into()));
    }
    Ok(())
}

/// Deducts `item.cost` from `profile` and returns the pending record to insert.
/// Leaves the profile untouched when the balance does not cover the cost.
pub fn redeem(
    profile: &mut Profile,
    item: &CatalogItem,
    form: &RedeemForm,
    id: String,
    now: DateTime<Utc>,
) -> Result<RedeemRecord, RuleViolation> {
    if profile.points < item.cost {
        return Err(RuleViolation::InsufficientPoints { balance: profile.points, cost: item.cost });
    }
    profile.points -= item.cost;
    Ok(RedeemRecord {
        id,
        user_id: profile.uid.clone(),
        user_name: profile.display_name.clone(),
        full_name: form.full_name.trim().to_string(),
        user_class: form.user_class.trim().to_string(),
        item_name: item.name.clone(),
        item_points: item.cost,
        status: RedeemStatus::Pending,
        redeemed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;

    fn profile(points: i64) -> Profile {
        Profile {
            uid: "a".into(),
            email: "a@example.com".into(),
            display_name: "a".into(),
            points,
            phone: None,
            address: None,
            age: None,
            is_admin: false,
            settings: Settings::default(),
        }
    }

    fn form() -> RedeemForm {
        RedeemForm { item_id: "1".into(), full_name: "Ahmad Bin Ali".into(), user_class: "Form 5 Amanah".into() }
    }

    #[test]
    fn catalog_is_fixed() {
        let costs: Vec<i64> = catalog().iter().map(|i| i.cost).collect();
        assert_eq!(costs, vec![20, 40, 50]);
        assert!(find_item("9").is_none());
    }

    #[test]
    fn insufficient_balance_leaves_points() {
        let mut p = profile(19);
        let item = find_item("1").unwrap();
        let err = redeem(&mut p, &item, &form(), "x".into(), Utc::now()).unwrap_err();
        assert_eq!(err, RuleViolation::InsufficientPoints { balance: 19, cost: 20 });
        assert_eq!(p.points, 19);
    }

    #[test]
    fn exact_balance_redeems() {
        let mut p = profile(40);
        let item = find_item("2").unwrap();
        let rec = redeem(&mut p, &item, &form(), "x".into(), Utc::now()).unwrap();
        assert_eq!(p.points, 0);
        assert_eq!(rec.item_points, 40);
        assert_eq!(rec.status, RedeemStatus::Pending);
    }

    #[test]
    fn form_requires_name_and_class() {
        let mut f = form();
        f.user_class = " ".into();
        assert!(validate_form(&f).is_err());
    }
}
