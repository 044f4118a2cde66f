use std::collections::HashMap;

use super::common::{
    application, build_service, conference_id, second_application, staff,
};
use crate::sponsorship::booth::{decisions_from_form, plan_batch};
use crate::sponsorship::directory::SponsorshipDirectory;
use crate::sponsorship::domain::{ConferenceId, SponsorshipId};
use crate::sponsorship::service::SponsorshipError;

#[test]
fn the_wire_form_assigns_on_literal_one_only() {
    let form: HashMap<String, String> = [
        ("spn-a".to_string(), "1".to_string()),
        ("spn-b".to_string(), "0".to_string()),
        ("spn-c".to_string(), "true".to_string()),
        ("spn-d".to_string(), String::new()),
    ]
    .into();

    let decisions = decisions_from_form(&form);
    assert_eq!(decisions[&SponsorshipId("spn-a".to_string())], true);
    assert_eq!(decisions[&SponsorshipId("spn-b".to_string())], false);
    assert_eq!(decisions[&SponsorshipId("spn-c".to_string())], false);
    assert_eq!(decisions[&SponsorshipId("spn-d".to_string())], false);
}

#[test]
fn unlisted_sponsorships_carry_no_decision() {
    let mut listed = super::common::bare_sponsorship();
    listed.id = SponsorshipId("spn-listed".to_string());
    let mut unlisted = super::common::bare_sponsorship();
    unlisted.id = SponsorshipId("spn-unlisted".to_string());
    unlisted.booth_assigned = true;

    let decisions: HashMap<SponsorshipId, bool> =
        [(SponsorshipId("spn-listed".to_string()), true)].into();
    let (to_update, unchanged) = plan_batch(vec![listed, unlisted], &decisions);

    assert_eq!(to_update.len(), 1);
    assert_eq!(to_update[0].id, SponsorshipId("spn-listed".to_string()));
    assert!(to_update[0].booth_assigned);
    assert!(unchanged.is_empty());
}

#[test]
fn a_decision_matching_the_current_state_is_reported_unchanged() {
    let mut already_assigned = super::common::bare_sponsorship();
    already_assigned.booth_assigned = true;
    let id = already_assigned.id.clone();

    let decisions: HashMap<SponsorshipId, bool> = [(id.clone(), true)].into();
    let (to_update, unchanged) = plan_batch(vec![already_assigned], &decisions);

    assert!(to_update.is_empty());
    assert_eq!(unchanged, vec![id]);
}

#[test]
fn assign_booths_flips_listed_rows_and_records_one_history_each() {
    let (service, directory, processor) = build_service();
    let first = service
        .apply(&conference_id(), application())
        .expect("first accepted");
    let second = service
        .apply(&conference_id(), second_application())
        .expect("second accepted");

    let decisions: HashMap<SponsorshipId, bool> = [(first.id.clone(), true)].into();
    let outcome = service
        .assign_booths(&conference_id(), &decisions, &staff())
        .expect("batch applied");

    assert_eq!(outcome.changed, vec![first.id.clone()]);
    assert!(outcome.unchanged.is_empty());

    let stored_first = directory
        .sponsorship(&first.id)
        .expect("lookup")
        .expect("persisted");
    assert!(stored_first.booth_assigned);
    let stored_second = directory
        .sponsorship(&second.id)
        .expect("lookup")
        .expect("persisted");
    assert!(!stored_second.booth_assigned);

    let histories = directory
        .histories_for_sponsorship(&first.id)
        .expect("history listing");
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].actor_id, staff());
    assert_eq!(histories[0].snapshot["booth_assigned"], false);
    assert!(directory
        .histories_for_sponsorship(&second.id)
        .expect("history listing")
        .is_empty());
    assert_eq!(processor.notified(), vec![histories[0].id.clone()]);
}

#[test]
fn a_satisfied_decision_produces_no_history() {
    let (service, directory, processor) = build_service();
    let first = service
        .apply(&conference_id(), application())
        .expect("accepted");

    let decisions: HashMap<SponsorshipId, bool> = [(first.id.clone(), false)].into();
    let outcome = service
        .assign_booths(&conference_id(), &decisions, &staff())
        .expect("batch applied");

    assert!(outcome.changed.is_empty());
    assert_eq!(outcome.unchanged, vec![first.id.clone()]);
    assert!(directory
        .histories_for_sponsorship(&first.id)
        .expect("history listing")
        .is_empty());
    assert!(processor.notified().is_empty());
}

#[test]
fn the_batch_aborts_whole_when_any_row_fails_validation() {
    let (service, directory, processor) = build_service();
    let first = service
        .apply(&conference_id(), application())
        .expect("first accepted");
    let second = service
        .apply(&conference_id(), second_application())
        .expect("second accepted");

    // Two rows on one organization violate uniqueness for every actor, so
    // the batch must fail before any booth flips.
    let mut poisoned = directory
        .sponsorship(&second.id)
        .expect("lookup")
        .expect("persisted");
    poisoned.organization_id = first.organization_id.clone();
    directory
        .update_sponsorship(poisoned)
        .expect("test seeding");

    let decisions: HashMap<SponsorshipId, bool> =
        [(first.id.clone(), true), (second.id.clone(), true)].into();
    let err = service
        .assign_booths(&conference_id(), &decisions, &staff())
        .unwrap_err();
    assert!(matches!(err, SponsorshipError::Invalid(_)));

    for id in [&first.id, &second.id] {
        let stored = directory
            .sponsorship(id)
            .expect("lookup")
            .expect("persisted");
        assert!(!stored.booth_assigned, "row {} was mutated", id.0);
        assert!(directory
            .histories_for_sponsorship(id)
            .expect("history listing")
            .is_empty());
    }
    assert!(processor.notified().is_empty());
}

#[test]
fn assign_booths_for_an_unknown_conference_is_not_found() {
    let (service, _, _) = build_service();

    let err = service
        .assign_booths(
            &ConferenceId("conf-ghost".to_string()),
            &HashMap::new(),
            &staff(),
        )
        .unwrap_err();
    assert!(matches!(err, SponsorshipError::NotFound));
}
