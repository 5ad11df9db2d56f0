use super::common::*;
use crate::subscriptions::domain::{
    has_active_subscription, Account, AccountKind, EntryAmendment, EntryId, Package, PackageId,
    RechargeEntry, RechargeError, SubscriptionState,
};
use chrono::{DateTime, Utc};
use serde_json::json;

fn expired_state(expired_days_ago: i64) -> SubscriptionState {
    SubscriptionState {
        last_recharge: Some(t0() - days(expired_days_ago + 30)),
        recharge_validity: Some(t0() - days(expired_days_ago)),
    }
}

#[test]
fn never_subscribed_window_starts_now() {
    let mut state = SubscriptionState::default();

    state.apply_recharge(30, t0()).expect("recharge applies");

    assert_eq!(state.last_recharge, Some(t0()));
    assert_eq!(state.recharge_validity, Some(t0() + days(30)));
}

#[test]
fn expired_window_discards_leftover_and_restarts() {
    let mut state = expired_state(3);

    state.apply_recharge(15, t0()).expect("recharge applies");

    assert_eq!(state.last_recharge, Some(t0()));
    assert_eq!(state.recharge_validity, Some(t0() + days(15)));
}

#[test]
fn active_window_stacks_from_current_expiry() {
    for remaining in [1, 7, 29] {
        let mut state = SubscriptionState {
            last_recharge: Some(t0() - days(1)),
            recharge_validity: Some(t0() + days(remaining)),
        };

        state.apply_recharge(20, t0()).expect("recharge applies");

        assert_eq!(state.last_recharge, Some(t0()));
        assert_eq!(state.recharge_validity, Some(t0() + days(remaining + 20)));
    }
}

#[test]
fn window_expiring_exactly_now_is_treated_as_lapsed() {
    let mut state = SubscriptionState {
        last_recharge: Some(t0() - days(30)),
        recharge_validity: Some(t0()),
    };

    state.apply_recharge(10, t0()).expect("recharge applies");

    assert_eq!(state.recharge_validity, Some(t0() + days(10)));
    assert_eq!(state.last_recharge, Some(t0()));
}

#[test]
fn zero_day_package_is_rejected_without_mutation() {
    let mut state = expired_state(1);
    let before = state;

    assert_eq!(
        state.apply_recharge(0, t0()),
        Err(RechargeError::ZeroValidity)
    );
    assert_eq!(state, before);
}

#[test]
fn gate_requires_validity_strictly_after_now() {
    let never = SubscriptionState::default();
    assert!(!never.is_active(t0()));

    let boundary = SubscriptionState {
        last_recharge: Some(t0() - days(30)),
        recharge_validity: Some(t0()),
    };
    assert!(!boundary.is_active(t0()));
    assert!(boundary.is_active(t0() - chrono::Duration::seconds(1)));

    assert!(!expired_state(2).is_active(t0()));
}

#[test]
fn remaining_reports_open_window_only() {
    let state = SubscriptionState {
        last_recharge: Some(t0()),
        recharge_validity: Some(t0() + days(12)),
    };

    assert_eq!(state.remaining(t0()), Some(days(12)));
    assert_eq!(state.remaining(t0() + days(12)), None);
    assert_eq!(SubscriptionState::default().remaining(t0()), None);
}

#[test]
fn candidate_and_recruiter_share_the_same_rule() {
    let mut candidate = candidate_registration().into_account();
    let mut recruiter = recruiter_registration().into_account();

    candidate.apply_recharge(30, t0()).expect("candidate recharge");
    recruiter.apply_recharge(30, t0()).expect("recruiter recharge");

    assert_eq!(candidate.kind(), AccountKind::Candidate);
    assert_eq!(recruiter.kind(), AccountKind::Recruiter);
    assert_eq!(candidate.subscription(), recruiter.subscription());
    assert!(has_active_subscription(&candidate, t0()));
    assert!(has_active_subscription(&recruiter, t0() + days(29)));
    assert!(!has_active_subscription(&recruiter, t0() + days(30)));
}

#[test]
fn accounts_serialize_with_kind_tag() {
    let account = candidate_registration().into_account();

    let value = serde_json::to_value(&account).expect("serializes");

    assert_eq!(value["kind"], "candidate");
    assert_eq!(value["user"], "cand-001");
    assert!(value["subscription"]["recharge_validity"].is_null());

    let round: Account = serde_json::from_value(value).expect("deserializes");
    assert_eq!(round, account);
}

fn sample_package() -> Package {
    Package {
        id: PackageId(4),
        name: "Gold".to_string(),
        account_kind: AccountKind::Recruiter,
        price: 1500,
        validity_days: 45,
        description: "Unlimited job posts".to_string(),
        available: true,
    }
}

fn sample_entry(snapshot: &str) -> RechargeEntry {
    RechargeEntry {
        id: EntryId(1),
        user: recruiter_id(),
        package: Some(PackageId(4)),
        created_at: t0(),
        package_snapshot: snapshot.to_string(),
    }
}

#[test]
fn snapshot_freezes_package_terms() {
    let package = sample_package();

    assert_eq!(
        package.snapshot(),
        "Name : Gold \nPrice : 1500 \nValidity Days : 45\nDescription : Unlimited job posts"
    );
    assert_eq!(package.label(), "Gold - 1500 - 45");
}

#[test]
fn refresh_snapshot_only_reports_real_changes() {
    let package = sample_package();

    let mut blank = sample_entry("");
    assert!(blank.refresh_snapshot(Some(&package)));
    assert_eq!(blank.package_snapshot, package.snapshot());
    assert!(!blank.refresh_snapshot(Some(&package)));

    let mut orphaned = sample_entry("frozen terms");
    orphaned.package = None;
    assert!(!orphaned.refresh_snapshot(None));
    assert_eq!(orphaned.package_snapshot, "frozen terms");
}

#[test]
fn amendment_distinguishes_missing_from_null_package() {
    let untouched: EntryAmendment =
        serde_json::from_value(json!({ "package_snapshot": "edited" })).expect("deserializes");
    assert_eq!(untouched.package, None);

    let detach: EntryAmendment =
        serde_json::from_value(json!({ "package": null })).expect("deserializes");
    assert_eq!(detach.package, Some(None));

    let repoint: EntryAmendment =
        serde_json::from_value(json!({ "package": 9 })).expect("deserializes");
    assert_eq!(repoint.package, Some(Some(PackageId(9))));

    for amendment in [untouched, detach, repoint] {
        let value = serde_json::to_value(&amendment).expect("serializes");
        let round: EntryAmendment = serde_json::from_value(value).expect("deserializes");
        assert_eq!(round, amendment);
    }

    let mut entry = sample_entry("frozen terms");
    EntryAmendment {
        package: Some(None),
        package_snapshot: None,
    }
    .apply(&mut entry);
    assert_eq!(entry.package, None);
    assert_eq!(entry.package_snapshot, "frozen terms");
}

#[test]
fn window_past_the_calendar_limit_is_rejected_without_mutation() {
    let near_end = DateTime::<Utc>::MAX_UTC - days(5);
    let mut state = SubscriptionState {
        last_recharge: Some(near_end - days(30)),
        recharge_validity: Some(near_end),
    };
    let before = state;

    assert_eq!(
        state.apply_recharge(30, near_end - days(1)),
        Err(RechargeError::WindowOverflow)
    );
    assert_eq!(state, before);

    let mut fresh = SubscriptionState::default();
    assert_eq!(
        fresh.apply_recharge(u32::MAX, t0()),
        Err(RechargeError::WindowOverflow)
    );
    assert_eq!(fresh, SubscriptionState::default());
}
