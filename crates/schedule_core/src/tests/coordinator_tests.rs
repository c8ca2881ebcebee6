use super::*;
use shared::domain::VolunteerId;

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

fn dates(values: &[&str]) -> BTreeSet<NaiveDate> {
    values.iter().map(|value| date(value)).collect()
}

/// Window from 2025-09-01 (a Monday): S1..S4 =
/// 2025-09-06, 2025-09-20, 2025-10-04, 2025-10-18.
fn coordinator() -> ConsistencyCoordinator {
    ConsistencyCoordinator::new(ScheduleConfig::default(), date("2025-09-01"))
}

fn active_dates(coordinator: &ConsistencyCoordinator) -> Vec<NaiveDate> {
    coordinator
        .window()
        .active()
        .iter()
        .map(|entry| entry.date)
        .collect()
}

#[test]
fn completion_rotates_the_window_and_cascades() {
    let mut coordinator = coordinator();
    let s1 = date("2025-09-06");
    coordinator
        .set_availability("Maria", dates(&["2025-09-06", "2025-09-20"]))
        .expect("set");
    coordinator.allocate(s1, Role::Hall, "Maria").expect("allocate");
    coordinator.allocate(s1, Role::Reception, "João").expect("allocate");

    let mutation = coordinator.mark_event_complete(s1).expect("complete");
    assert_eq!(
        mutation,
        AppliedMutation::EventCompleted {
            date_id: s1,
            completed_date: s1,
        }
    );

    assert_eq!(
        active_dates(&coordinator),
        vec![
            date("2025-09-20"),
            date("2025-10-04"),
            date("2025-10-18"),
            date("2025-11-01"),
        ]
    );
    assert!(coordinator.availability().who_is_available(s1).is_empty());
    assert!(coordinator.allocations().records_for_date(s1).is_empty());
    assert_eq!(
        coordinator.availability().who_is_available(date("2025-09-20")),
        vec!["Maria"]
    );
}

#[test]
fn rename_cascades_into_both_ledgers_with_no_residue() {
    let mut coordinator = coordinator();
    let old = date("2025-09-20");
    let new = date("2025-09-27");
    coordinator
        .set_availability("Maria", dates(&["2025-09-20"]))
        .expect("set");
    coordinator.allocate(old, Role::Hall, "Maria").expect("allocate");

    let mutation = coordinator.rename_date(old, new).expect("rename");
    match mutation {
        AppliedMutation::DateRenamed {
            old_value,
            new_value,
            dates,
        } => {
            assert_eq!(old_value, old);
            assert_eq!(new_value, new);
            assert_eq!(dates.len(), 4);
        }
        other => panic!("unexpected mutation {other:?}"),
    }

    assert!(coordinator.availability().who_is_available(old).is_empty());
    assert!(coordinator.allocations().records_for_date(old).is_empty());
    assert_eq!(coordinator.availability().who_is_available(new), vec!["Maria"]);
    assert_eq!(coordinator.allocations().records_for_date(new).len(), 1);
}

#[test]
fn availability_removal_cascades_into_allocations() {
    let mut coordinator = coordinator();
    let s1 = date("2025-09-06");
    coordinator
        .set_availability("Maria", dates(&["2025-09-06"]))
        .expect("set");
    coordinator.allocate(s1, Role::Hall, "Maria").expect("allocate");
    coordinator.allocate(s1, Role::Reception, "Maria").expect("allocate");

    let mutation = coordinator
        .remove_volunteer_availability("maria", s1)
        .expect("remove");
    match mutation {
        AppliedMutation::AvailabilityDateRemoved {
            volunteer_name,
            date: removed_date,
            cascaded_allocations,
        } => {
            assert_eq!(volunteer_name, "Maria");
            assert_eq!(removed_date, s1);
            assert_eq!(cascaded_allocations.len(), 2);
        }
        other => panic!("unexpected mutation {other:?}"),
    }

    assert!(coordinator.allocations().records_for_date(s1).is_empty());
}

#[test]
fn duplicate_volunteer_names_are_rejected_case_insensitively() {
    let mut coordinator = coordinator();
    coordinator.add_volunteer("Maria").expect("add");
    let err = coordinator.add_volunteer("maria").unwrap_err();
    assert!(matches!(err, ScheduleError::Duplicate(_)));
}

#[test]
fn deallocate_twice_is_safe() {
    let mut coordinator = coordinator();
    let s1 = date("2025-09-06");
    coordinator.allocate(s1, Role::Hall, "Maria").expect("allocate");

    coordinator.deallocate(s1, Role::Hall, "Maria");
    coordinator.deallocate(s1, Role::Hall, "Maria");
    assert!(coordinator.allocations().records_for_date(s1).is_empty());
}

#[test]
fn allocation_requires_an_active_date_and_a_person() {
    let mut coordinator = coordinator();
    let err = coordinator
        .allocate(date("2025-01-01"), Role::Hall, "Maria")
        .unwrap_err();
    assert!(matches!(err, ScheduleError::NotFound(_)));

    let err = coordinator
        .allocate(date("2025-09-06"), Role::Hall, "  ")
        .unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidArgument(_)));
}

#[test]
fn availability_must_stay_inside_the_active_window() {
    let mut coordinator = coordinator();
    let err = coordinator
        .set_availability("Maria", dates(&["2025-09-06", "2026-01-03"]))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidArgument(_)));
    assert!(coordinator.availability().records().is_empty());
}

#[test]
fn projection_splits_available_from_allocated_and_lists_every_role() {
    let mut coordinator = coordinator();
    let s2 = date("2025-09-20");
    coordinator
        .set_availability("Maria", dates(&["2025-09-20", "2025-10-04"]))
        .expect("set");
    coordinator
        .set_availability("João", dates(&["2025-09-20"]))
        .expect("set");
    coordinator.allocate(s2, Role::Hall, "Maria").expect("allocate");

    let projection = coordinator.project_date(s2);
    assert_eq!(projection.available_unallocated, vec!["João"]);
    assert_eq!(projection.allocated_by_role.len(), Role::ALL.len());
    for (role, people) in &projection.allocated_by_role {
        if *role == Role::Hall {
            assert_eq!(people, &vec!["Maria".to_string()]);
        } else {
            assert!(people.is_empty(), "role {role} should be empty");
        }
    }
}

#[test]
fn from_remote_merges_bare_volunteers_with_empty_sets() {
    let config = ScheduleConfig::default();
    let window_dates = vec![
        EventDate::active(date("2025-09-06")),
        EventDate::active(date("2025-09-20")),
    ];
    let mut maria = AvailabilityRecord::empty(VolunteerId::fresh(), "Maria");
    maria.dates.insert(date("2025-09-06"));
    let ana = Volunteer {
        id: VolunteerId::fresh(),
        name: "Ana".into(),
    };

    let coordinator = ConsistencyCoordinator::from_remote(
        config,
        window_dates,
        &[ana.clone()],
        vec![maria],
        Vec::new(),
    );

    let records = coordinator.availability().records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].volunteer_name, "Ana");
    assert!(records[1].dates.is_empty());
    assert_eq!(coordinator.volunteers().len(), 2);
}

#[test]
fn restore_replaces_local_state_wholesale() {
    let mut coordinator = coordinator();
    coordinator
        .set_availability("Maria", dates(&["2025-09-06"]))
        .expect("set");
    coordinator
        .allocate(date("2025-09-06"), Role::Hall, "Maria")
        .expect("allocate");

    let remote_dates = vec![EventDate::active(date("2025-12-06"))];
    coordinator.restore(remote_dates, &[], Vec::new(), Vec::new());

    assert_eq!(active_dates(&coordinator), vec![date("2025-12-06")]);
    assert!(coordinator.availability().records().is_empty());
    assert!(coordinator.allocations().records().is_empty());
    assert_eq!(coordinator.snapshot().allocations.len(), 0);
}
