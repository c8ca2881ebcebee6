use super::*;

#[test]
fn role_labels_round_trip_through_from_str() {
    for role in Role::ALL {
        let parsed: Role = role.label().parse().expect("label should parse");
        assert_eq!(parsed, role);
    }
}

#[test]
fn unknown_role_label_is_rejected() {
    let err = "Kitchen".parse::<Role>().unwrap_err();
    assert_eq!(err.code(), crate::error::ErrorCode::InvalidArgument);
}

#[test]
fn role_serializes_to_fixed_wire_label() {
    let json = serde_json::to_string(&Role::ChildrensOutreach).expect("serialize");
    assert_eq!(json, "\"Children's Outreach\"");
}

#[test]
fn access_keys_resolve_to_binary_roles() {
    let keys = AccessKeys {
        volunteer: "v-key".into(),
        coordinator: "c-key".into(),
    };
    assert_eq!(keys.resolve("v-key"), Some(AccessRole::Volunteer));
    assert_eq!(keys.resolve("c-key"), Some(AccessRole::Coordinator));
    assert_eq!(keys.resolve("nope"), None);
}

#[test]
fn fold_name_trims_and_case_folds() {
    assert_eq!(fold_name("  Maria Silva "), "maria silva");
    assert_eq!(fold_name("JOÃO"), fold_name("joão"));
}

#[test]
fn active_event_date_uses_date_as_id() {
    let date = NaiveDate::from_ymd_opt(2025, 9, 6).expect("valid date");
    let event = EventDate::active(date);
    assert_eq!(event.id, event.date);
    assert_eq!(event.status, EventDateStatus::Active);
}
