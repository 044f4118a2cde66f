use std::sync::{Arc, Mutex};

use crate::sponsorship::directory::{
    CapacityOracle, InMemoryDirectory, OracleError, PlanAvailabilityOracle, SponsorshipDirectory,
};
use crate::sponsorship::domain::{
    AssetFile, AssetFileId, Conference, ConferenceId, Contact, ContactId, ContactInput,
    Organization, OrganizationId, Plan, PlanId, Sponsorship, SponsorshipId, StaffId,
};
use crate::sponsorship::domain::ChildDirective;
use crate::sponsorship::history::{HistoryId, HistoryProcessor};
use crate::sponsorship::service::{
    SponsorshipApplication, SponsorshipPatch, SponsorshipService,
};

pub(super) type TestService =
    SponsorshipService<InMemoryDirectory, CapacityOracle<InMemoryDirectory>, MemoryProcessor>;

pub(super) fn conference_id() -> ConferenceId {
    ConferenceId("conf-aurora".to_string())
}

pub(super) fn conference() -> Conference {
    Conference {
        id: conference_id(),
        slug: "aurora-2026".to_string(),
        name: "Aurora 2026".to_string(),
        contact_email_address: "sponsorships@aurora.example".to_string(),
    }
}

pub(super) fn platinum_plan() -> Plan {
    Plan {
        id: PlanId("plan-platinum".to_string()),
        conference_id: conference_id(),
        name: "Platinum".to_string(),
        rank: 1,
        capacity: Some(2),
        number_of_guests: 5,
        booth_size: 4,
        word_limit_hard: Some(200),
    }
}

pub(super) fn solo_plan() -> Plan {
    Plan {
        id: PlanId("plan-solo".to_string()),
        conference_id: conference_id(),
        name: "Solo".to_string(),
        rank: 2,
        capacity: Some(1),
        number_of_guests: 1,
        booth_size: 2,
        word_limit_hard: Some(150),
    }
}

pub(super) fn community_plan() -> Plan {
    Plan {
        id: PlanId("plan-community".to_string()),
        conference_id: conference_id(),
        name: "Community".to_string(),
        rank: 3,
        capacity: None,
        number_of_guests: 1,
        booth_size: 0,
        word_limit_hard: Some(100),
    }
}

pub(super) fn other_conference_plan() -> Plan {
    Plan {
        id: PlanId("plan-borealis".to_string()),
        conference_id: ConferenceId("conf-borealis".to_string()),
        name: "Borealis Gold".to_string(),
        rank: 1,
        capacity: Some(5),
        number_of_guests: 2,
        booth_size: 2,
        word_limit_hard: Some(150),
    }
}

pub(super) fn contact_input(email: &str) -> ContactInput {
    ContactInput {
        name: "Jordan Reyes".to_string(),
        email: email.to_string(),
        organization: "Initech".to_string(),
        unit: "Developer Relations".to_string(),
        address: "100 Main St, Des Moines".to_string(),
    }
}

pub(super) fn application() -> SponsorshipApplication {
    SponsorshipApplication {
        plan_id: Some(platinum_plan().id),
        name: "Initech".to_string(),
        url: "https://initech.example".to_string(),
        profile: "We build TPS report automation for teams of every size.".to_string(),
        locale: "en".to_string(),
        booth_requested: true,
        customization: false,
        customization_name: None,
        number_of_additional_attendees: Some(2),
        asset_file_id: Some(AssetFileId("asset-initech".to_string())),
        organization_id: None,
        policy_agreement: true,
        contact: contact_input("jordan@initech.example"),
        alternate_billing_contact: None,
        billing_request: Some("Invoice in USD, net 30.".to_string()),
        customization_request: None,
        note: None,
    }
}

pub(super) fn second_application() -> SponsorshipApplication {
    let mut application = application();
    application.name = "Globex".to_string();
    application.url = "https://globex.example".to_string();
    application.contact = contact_input("sam@globex.example");
    application.asset_file_id = Some(AssetFileId("asset-globex".to_string()));
    application
}

pub(super) fn staff() -> StaffId {
    StaffId("staff-amara".to_string())
}

/// A no-op patch for `sponsorship`: scalars restated, children left alone.
pub(super) fn patch_for(sponsorship: &Sponsorship) -> SponsorshipPatch {
    SponsorshipPatch {
        plan_id: sponsorship.plan_id.clone(),
        name: sponsorship.name.clone(),
        url: sponsorship.url.clone(),
        profile: sponsorship.profile.clone(),
        booth_requested: sponsorship.booth_requested,
        customization: sponsorship.customization,
        customization_name: sponsorship.customization_name.clone(),
        number_of_additional_attendees: sponsorship.number_of_additional_attendees,
        asset_file_id: None,
        booth_assigned: None,
        suspended: None,
        contact: None,
        alternate_billing_contact: ChildDirective::NoChange,
        billing_request: ChildDirective::NoChange,
        customization_request: ChildDirective::NoChange,
        note: ChildDirective::NoChange,
    }
}

/// Standalone aggregate for unit tests that never touch a directory.
pub(super) fn bare_sponsorship() -> Sponsorship {
    Sponsorship {
        id: SponsorshipId("spn-test".to_string()),
        conference_id: conference_id(),
        organization_id: OrganizationId("org-initech".to_string()),
        plan_id: Some(platinum_plan().id),
        name: "Initech".to_string(),
        url: "https://initech.example".to_string(),
        profile: "We build TPS report automation.".to_string(),
        locale: "en".to_string(),
        booth_requested: true,
        booth_assigned: false,
        suspended: false,
        withdrawn_at: None,
        customization: false,
        customization_name: None,
        number_of_additional_attendees: Some(2),
        asset_file: Some(AssetFile {
            id: AssetFileId("asset-initech".to_string()),
        }),
        contact: Contact {
            id: ContactId("cnt-test".to_string()),
            name: "Jordan Reyes".to_string(),
            email: "jordan@initech.example".to_string(),
            organization: "Initech".to_string(),
            unit: "Developer Relations".to_string(),
            address: "100 Main St, Des Moines".to_string(),
        },
        alternate_billing_contact: None,
        billing_request: None,
        customization_request: None,
        note: None,
    }
}

pub(super) fn organization() -> Organization {
    Organization {
        id: OrganizationId("org-initech".to_string()),
        name: "Initech".to_string(),
        domain: "initech.example".to_string(),
    }
}

pub(super) fn seeded_directory() -> Arc<InMemoryDirectory> {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.put_conference(conference());
    directory.put_conference(Conference {
        id: ConferenceId("conf-borealis".to_string()),
        slug: "borealis-2026".to_string(),
        name: "Borealis 2026".to_string(),
        contact_email_address: "team@borealis.example".to_string(),
    });
    directory.put_plan(platinum_plan());
    directory.put_plan(solo_plan());
    directory.put_plan(community_plan());
    directory.put_plan(other_conference_plan());
    directory.register_asset(
        AssetFileId("asset-initech".to_string()),
        "https://assets.example/asset-initech.zip",
    );
    directory.register_asset(
        AssetFileId("asset-globex".to_string()),
        "https://assets.example/asset-globex.zip",
    );
    directory
}

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<InMemoryDirectory>,
    Arc<MemoryProcessor>,
) {
    let directory = seeded_directory();
    let oracle = Arc::new(CapacityOracle::new(directory.clone()));
    let processor = Arc::new(MemoryProcessor::default());
    let service = Arc::new(SponsorshipService::new(
        directory.clone(),
        oracle,
        processor.clone(),
    ));
    (service, directory, processor)
}

pub(super) fn build_service_with_oracle<O: PlanAvailabilityOracle + 'static>(
    oracle: O,
) -> (
    Arc<SponsorshipService<InMemoryDirectory, O, MemoryProcessor>>,
    Arc<InMemoryDirectory>,
    Arc<MemoryProcessor>,
) {
    let directory = seeded_directory();
    let processor = Arc::new(MemoryProcessor::default());
    let service = Arc::new(SponsorshipService::new(
        directory.clone(),
        Arc::new(oracle),
        processor.clone(),
    ));
    (service, directory, processor)
}

/// Processor double that records notifications. When a watch is set it also
/// asserts the notified row is already durable for that sponsorship, which
/// pins the persist-then-notify ordering.
#[derive(Default)]
pub(super) struct MemoryProcessor {
    notified: Mutex<Vec<HistoryId>>,
    watch: Mutex<Option<(Arc<InMemoryDirectory>, SponsorshipId)>>,
}

impl MemoryProcessor {
    pub(super) fn watch_sponsorship(
        &self,
        directory: Arc<InMemoryDirectory>,
        sponsorship_id: SponsorshipId,
    ) {
        *self.watch.lock().expect("processor mutex poisoned") = Some((directory, sponsorship_id));
    }

    pub(super) fn notified(&self) -> Vec<HistoryId> {
        self.notified
            .lock()
            .expect("processor mutex poisoned")
            .clone()
    }
}

impl HistoryProcessor for MemoryProcessor {
    fn notify(&self, history_id: &HistoryId) {
        if let Some((directory, sponsorship_id)) =
            self.watch.lock().expect("processor mutex poisoned").as_ref()
        {
            let persisted = directory
                .histories_for_sponsorship(sponsorship_id)
                .expect("history lookup");
            assert!(
                persisted.iter().any(|history| &history.id == history_id),
                "notified before the history row was persisted"
            );
        }
        self.notified
            .lock()
            .expect("processor mutex poisoned")
            .push(history_id.clone());
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Oracle double that always errors, for fail-closed coverage.
pub(super) struct UnreachableOracle;

impl PlanAvailabilityOracle for UnreachableOracle {
    fn is_available(&self, _plan_id: &PlanId) -> Result<bool, OracleError> {
        Err(OracleError::Timeout)
    }
}
