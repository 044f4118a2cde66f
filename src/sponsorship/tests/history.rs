use chrono::Utc;

use super::common::{
    application, bare_sponsorship, build_service, conference_id, organization, patch_for,
    platinum_plan, staff,
};
use crate::sponsorship::domain::SponsorshipId;
use crate::sponsorship::history::{EditingHistory, HistoryId};
use crate::sponsorship::service::SponsorshipError;

#[test]
fn capture_attributes_the_actor_and_subject() {
    let sponsorship = bare_sponsorship();
    let history = EditingHistory::capture(
        HistoryId("hist-1".to_string()),
        &sponsorship,
        Some(&platinum_plan()),
        &organization(),
        &staff(),
        Utc::now(),
    );

    assert_eq!(history.sponsorship_id, sponsorship.id);
    assert_eq!(history.actor_id, staff());
    assert_eq!(history.snapshot["name"], "Initech");
    assert_eq!(history.snapshot["plan_name"], "Platinum");
}

#[test]
fn successive_staff_amendments_record_successive_prior_states() {
    let (service, _, _) = build_service();
    let sponsorship = service
        .apply(&conference_id(), application())
        .expect("application accepted");

    let mut patch = patch_for(&sponsorship);
    patch.name = "Initech GmbH".to_string();
    let renamed = service
        .staff_amend(&sponsorship.id, patch, &staff())
        .expect("first amendment");

    let mut patch = patch_for(&renamed);
    patch.name = "Initech AG".to_string();
    service
        .staff_amend(&sponsorship.id, patch, &staff())
        .expect("second amendment");

    let histories = service
        .editing_histories(&sponsorship.id)
        .expect("history listing");
    assert_eq!(histories.len(), 2);
    assert_eq!(histories[0].snapshot["name"], "Initech");
    assert_eq!(histories[1].snapshot["name"], "Initech GmbH");
    assert!(histories[0].created_at <= histories[1].created_at);
}

#[test]
fn the_processor_is_notified_only_after_the_row_is_durable() {
    let (service, directory, processor) = build_service();
    let sponsorship = service
        .apply(&conference_id(), application())
        .expect("application accepted");
    processor.watch_sponsorship(directory, sponsorship.id.clone());

    let patch = patch_for(&sponsorship);
    service
        .staff_amend(&sponsorship.id, patch, &staff())
        .expect("staff amendment accepted");

    // The watch inside the processor asserts durability at notify time.
    assert_eq!(processor.notified().len(), 1);
}

#[test]
fn self_service_amendments_leave_no_history() {
    let (service, _, processor) = build_service();
    let sponsorship = service
        .apply(&conference_id(), application())
        .expect("application accepted");

    let mut patch = patch_for(&sponsorship);
    patch.url = "https://initech.example/sponsoring".to_string();
    service.amend(&sponsorship.id, patch).expect("amended");

    let histories = service
        .editing_histories(&sponsorship.id)
        .expect("history listing");
    assert!(histories.is_empty());
    assert!(processor.notified().is_empty());
}

#[test]
fn history_listing_for_an_unknown_sponsorship_is_not_found() {
    let (service, _, _) = build_service();

    let err = service
        .editing_histories(&SponsorshipId("spn-ghost".to_string()))
        .unwrap_err();
    assert!(matches!(err, SponsorshipError::NotFound));
}
