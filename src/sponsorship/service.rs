use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::booth::{plan_batch, BoothAssignmentOutcome};
use super::directory::{PlanAvailabilityOracle, SponsorshipDirectory, StoreError};
use super::domain::{
    email_domain, AssetFile, AssetFileId, ChildDirective, Conference, ConferenceId, Contact,
    ContactId, ContactInput, Organization, OrganizationId, Plan, PlanId, RequestId, Sponsorship,
    SponsorshipId, SponsorshipRequest, SponsorshipSummary, StaffId,
};
use super::history::{EditingHistory, HistoryId, HistoryProcessor};
use super::validation::{validate, ActorContext, RuleInput, Violation, ViolationKind};

/// A sponsor's initial application for one conference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorshipApplication {
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    pub name: String,
    pub url: String,
    pub profile: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub booth_requested: bool,
    #[serde(default)]
    pub customization: bool,
    #[serde(default)]
    pub customization_name: Option<String>,
    #[serde(default)]
    pub number_of_additional_attendees: Option<u32>,
    #[serde(default)]
    pub asset_file_id: Option<AssetFileId>,
    /// When absent the organization is assumed from the contact email domain.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    /// Must be explicitly set for a brand-new application.
    #[serde(default)]
    pub policy_agreement: bool,
    pub contact: ContactInput,
    #[serde(default)]
    pub alternate_billing_contact: Option<ContactInput>,
    #[serde(default)]
    pub billing_request: Option<String>,
    #[serde(default)]
    pub customization_request: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_locale() -> String {
    "en".to_string()
}

/// An amendment to an existing sponsorship. Scalar fields replace the stored
/// values; each optional child follows the explicit tri-state directive, so an
/// omitted child is left alone rather than silently deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorshipPatch {
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    pub name: String,
    pub url: String,
    pub profile: String,
    #[serde(default)]
    pub booth_requested: bool,
    #[serde(default)]
    pub customization: bool,
    #[serde(default)]
    pub customization_name: Option<String>,
    #[serde(default)]
    pub number_of_additional_attendees: Option<u32>,
    /// `None` keeps the current asset reference.
    #[serde(default)]
    pub asset_file_id: Option<AssetFileId>,
    /// Honored only through the staff surface.
    #[serde(default)]
    pub booth_assigned: Option<bool>,
    /// Honored only through the staff surface.
    #[serde(default)]
    pub suspended: Option<bool>,
    /// Primary contact supports upsert only; `None` keeps the current one.
    #[serde(default)]
    pub contact: Option<ContactInput>,
    #[serde(default)]
    pub alternate_billing_contact: ChildDirective<ContactInput>,
    #[serde(default)]
    pub billing_request: ChildDirective<String>,
    #[serde(default)]
    pub customization_request: ChildDirective<String>,
    #[serde(default)]
    pub note: ChildDirective<String>,
}

/// Error raised by the sponsorship service.
#[derive(Debug, thiserror::Error)]
pub enum SponsorshipError {
    #[error("validation failed with {} violation(s)", .0.len())]
    Invalid(Vec<Violation>),
    #[error("record not found")]
    NotFound,
    #[error("sponsorship has been withdrawn")]
    Withdrawn,
    #[error(transparent)]
    Store(#[from] StoreError),
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// Service composing the validation pipeline, directory, availability oracle,
/// and editing-history hand-off.
pub struct SponsorshipService<D, O, P> {
    directory: Arc<D>,
    oracle: Arc<O>,
    processor: Arc<P>,
    // Serializes every check-then-write: the last slot of a plan cannot be
    // claimed twice and booth batches never interleave.
    write_gate: Mutex<()>,
}

impl<D, O, P> SponsorshipService<D, O, P>
where
    D: SponsorshipDirectory + 'static,
    O: PlanAvailabilityOracle + 'static,
    P: HistoryProcessor + 'static,
{
    pub fn new(directory: Arc<D>, oracle: Arc<O>, processor: Arc<P>) -> Self {
        Self {
            directory,
            oracle,
            processor,
            write_gate: Mutex::new(()),
        }
    }

    /// Submit a new application. Nothing is persisted when validation fails,
    /// including an assumed organization.
    pub fn apply(
        &self,
        conference_id: &ConferenceId,
        application: SponsorshipApplication,
    ) -> Result<Sponsorship, SponsorshipError> {
        let _gate = self.write_gate.lock().expect("write gate poisoned");

        let conference = self
            .directory
            .conference(conference_id)?
            .ok_or(SponsorshipError::NotFound)?;

        let (organization_id, new_organization) = match &application.organization_id {
            Some(id) => {
                self.directory
                    .organization(id)?
                    .ok_or(SponsorshipError::NotFound)?;
                (id.clone(), None)
            }
            None => self.assume_organization(&application)?,
        };

        let policy_agreement = application.policy_agreement;
        let proposed = Sponsorship {
            id: SponsorshipId(next_id("spn")),
            conference_id: conference.id.clone(),
            organization_id,
            plan_id: application.plan_id,
            name: application.name,
            url: application.url,
            profile: application.profile,
            locale: application.locale,
            booth_requested: application.booth_requested,
            booth_assigned: false,
            suspended: false,
            withdrawn_at: None,
            customization: application.customization,
            customization_name: application.customization_name,
            number_of_additional_attendees: application.number_of_additional_attendees,
            asset_file: application.asset_file_id.map(|id| AssetFile { id }),
            contact: application.contact.into_contact(ContactId(next_id("cnt"))),
            alternate_billing_contact: application
                .alternate_billing_contact
                .map(|contact| contact.into_contact(ContactId(next_id("cnt")))),
            billing_request: application.billing_request.map(new_request),
            customization_request: application.customization_request.map(new_request),
            note: application.note.map(new_request),
        };

        self.check(None, &proposed, ActorContext::SelfService, policy_agreement)?;

        if let Some(organization) = new_organization {
            self.directory.insert_organization(organization)?;
        }
        self.directory.insert_sponsorship(proposed.clone())?;

        info!(
            sponsorship = %proposed.id.0,
            conference = %conference.slug,
            "sponsorship application accepted"
        );
        Ok(proposed)
    }

    /// Sponsor self-service amendment.
    pub fn amend(
        &self,
        id: &SponsorshipId,
        mut patch: SponsorshipPatch,
    ) -> Result<Sponsorship, SponsorshipError> {
        // Staff-only fields never ride in through the sponsor surface.
        patch.booth_assigned = None;
        patch.suspended = None;

        let _gate = self.write_gate.lock().expect("write gate poisoned");

        let current = self
            .directory
            .sponsorship(id)?
            .ok_or(SponsorshipError::NotFound)?;
        if !current.active() {
            return Err(SponsorshipError::Withdrawn);
        }

        let proposed = apply_patch(&current, patch);
        self.check(Some(&current), &proposed, ActorContext::SelfService, true)?;
        self.directory.update_sponsorship(proposed.clone())?;
        Ok(proposed)
    }

    /// Staff-attributed amendment: business rules are bypassed, structural
    /// rules still hold, and the pre-mutation state is recorded as editing
    /// history before the processor is notified.
    pub fn staff_amend(
        &self,
        id: &SponsorshipId,
        patch: SponsorshipPatch,
        staff: &StaffId,
    ) -> Result<Sponsorship, SponsorshipError> {
        let (proposed, history_id) = {
            let _gate = self.write_gate.lock().expect("write gate poisoned");

            let current = self
                .directory
                .sponsorship(id)?
                .ok_or(SponsorshipError::NotFound)?;
            let proposed = apply_patch(&current, patch);
            self.check(Some(&current), &proposed, ActorContext::StaffOverride, true)?;

            let history = self.capture_history(&current, staff)?;
            self.directory.update_sponsorship(proposed.clone())?;
            self.directory.append_history(history.clone())?;
            (proposed, history.id)
        };

        // The row is durable by now; hand-off happens outside the gate.
        self.processor.notify(&history_id);
        Ok(proposed)
    }

    /// One-way withdrawal. Repeatable: the timestamp is refreshed and the
    /// cleared fields re-asserted.
    pub fn withdraw(&self, id: &SponsorshipId) -> Result<Sponsorship, SponsorshipError> {
        let _gate = self.write_gate.lock().expect("write gate poisoned");

        let mut sponsorship = self
            .directory
            .sponsorship(id)?
            .ok_or(SponsorshipError::NotFound)?;
        sponsorship.withdraw(Utc::now());
        self.directory.update_sponsorship(sponsorship.clone())?;

        info!(sponsorship = %sponsorship.id.0, "sponsorship withdrawn");
        Ok(sponsorship)
    }

    /// Apply a staff decision map across one conference. Only listed
    /// sponsorships whose decided value differs are mutated; the batch is
    /// all-or-nothing, and one editing-history row is recorded per change.
    pub fn assign_booths(
        &self,
        conference_id: &ConferenceId,
        decisions: &HashMap<SponsorshipId, bool>,
        staff: &StaffId,
    ) -> Result<BoothAssignmentOutcome, SponsorshipError> {
        let (outcome, histories) = {
            let _gate = self.write_gate.lock().expect("write gate poisoned");

            self.directory
                .conference(conference_id)?
                .ok_or(SponsorshipError::NotFound)?;
            let sponsorships = self.directory.sponsorships_for_conference(conference_id)?;
            let (to_update, unchanged) = plan_batch(sponsorships, decisions);

            // Validate every row before touching any of them.
            let mut captured = Vec::new();
            for updated in &to_update {
                let current = self
                    .directory
                    .sponsorship(&updated.id)?
                    .ok_or(SponsorshipError::NotFound)?;
                self.check(Some(&current), updated, ActorContext::StaffOverride, true)?;
                captured.push(self.capture_history(&current, staff)?);
            }

            let changed: Vec<SponsorshipId> =
                to_update.iter().map(|sponsorship| sponsorship.id.clone()).collect();
            self.directory.update_sponsorships(to_update)?;
            for history in &captured {
                self.directory.append_history(history.clone())?;
            }

            (BoothAssignmentOutcome { changed, unchanged }, captured)
        };

        for history in &histories {
            self.processor.notify(&history.id);
        }

        info!(
            conference = %conference_id.0,
            changed = outcome.changed.len(),
            unchanged = outcome.unchanged.len(),
            "booth assignments applied"
        );
        Ok(outcome)
    }

    pub fn get(&self, id: &SponsorshipId) -> Result<Sponsorship, SponsorshipError> {
        self.directory
            .sponsorship(id)?
            .ok_or(SponsorshipError::NotFound)
    }

    pub fn conference_by_slug(&self, slug: &str) -> Result<Conference, SponsorshipError> {
        self.directory
            .conference_by_slug(slug)?
            .ok_or(SponsorshipError::NotFound)
    }

    /// API projection with the plan resolved for derived queries.
    pub fn summarize(
        &self,
        sponsorship: &Sponsorship,
    ) -> Result<SponsorshipSummary, SponsorshipError> {
        let plan = self.resolve_plan(sponsorship.plan_id.as_ref())?;
        Ok(sponsorship.summary(plan.as_ref()))
    }

    pub fn editing_histories(
        &self,
        id: &SponsorshipId,
    ) -> Result<Vec<EditingHistory>, SponsorshipError> {
        self.directory
            .sponsorship(id)?
            .ok_or(SponsorshipError::NotFound)?;
        Ok(self.directory.histories_for_sponsorship(id)?)
    }

    /// Resolve the download URL of the sponsorship's asset file.
    pub fn asset_download_url(&self, id: &SponsorshipId) -> Result<String, SponsorshipError> {
        let sponsorship = self
            .directory
            .sponsorship(id)?
            .ok_or(SponsorshipError::NotFound)?;
        let asset = sponsorship.asset_file.ok_or(SponsorshipError::NotFound)?;
        self.directory
            .asset_download_url(&asset.id)?
            .ok_or(SponsorshipError::NotFound)
    }

    /// Derive the sponsoring organization from the primary contact's email
    /// domain. An existing organization with that domain is reused; otherwise
    /// a candidate named after the sponsorship is returned for insertion
    /// after validation passes.
    fn assume_organization(
        &self,
        application: &SponsorshipApplication,
    ) -> Result<(OrganizationId, Option<Organization>), SponsorshipError> {
        let Some(domain) = email_domain(&application.contact.email) else {
            return Err(SponsorshipError::Invalid(vec![Violation::new(
                "contact",
                ViolationKind::Presence,
            )]));
        };

        if let Some(existing) = self.directory.organization_by_domain(domain)? {
            return Ok((existing.id, None));
        }

        let organization = Organization {
            id: OrganizationId(next_id("org")),
            name: application.name.clone(),
            domain: domain.to_string(),
        };
        Ok((organization.id.clone(), Some(organization)))
    }

    /// Resolve all validation facts and run the pipeline for `context`.
    fn check(
        &self,
        current: Option<&Sponsorship>,
        proposed: &Sponsorship,
        context: ActorContext,
        policy_agreement: bool,
    ) -> Result<(), SponsorshipError> {
        let plan = self.resolve_plan(proposed.plan_id.as_ref())?;

        let organization_taken = self.organization_taken(
            &proposed.conference_id,
            &proposed.organization_id,
            current.map(|current| &current.id),
        )?;

        let plan_newly_assigned = proposed.plan_id.is_some()
            && current.map_or(true, |current| proposed.plan_id != current.plan_id);
        let plan_available = self.plan_availability(plan_newly_assigned, plan.as_ref());
        let booth_newly_requested = proposed.booth_requested
            && !current.map_or(false, |current| current.booth_requested);

        let input = RuleInput {
            proposed,
            creating: current.is_none(),
            policy_agreement,
            organization_taken,
            plan: plan.as_ref(),
            plan_newly_assigned,
            plan_available,
            booth_newly_requested,
        };

        let violations = validate(&input, context);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SponsorshipError::Invalid(violations))
        }
    }

    fn resolve_plan(&self, plan_id: Option<&PlanId>) -> Result<Option<Plan>, SponsorshipError> {
        match plan_id {
            Some(id) => Ok(Some(
                self.directory.plan(id)?.ok_or(SponsorshipError::NotFound)?,
            )),
            None => Ok(None),
        }
    }

    fn organization_taken(
        &self,
        conference_id: &ConferenceId,
        organization_id: &OrganizationId,
        excluding: Option<&SponsorshipId>,
    ) -> Result<bool, SponsorshipError> {
        let taken = self
            .directory
            .sponsorships_for_conference(conference_id)?
            .iter()
            .any(|sponsorship| {
                &sponsorship.organization_id == organization_id
                    && excluding.map_or(true, |id| &sponsorship.id != id)
            });
        Ok(taken)
    }

    /// Oracle consultation, failing closed: an oracle failure counts as
    /// "not available" rather than permitting an unchecked assignment.
    fn plan_availability(&self, plan_newly_assigned: bool, plan: Option<&Plan>) -> bool {
        let Some(plan) = plan else {
            return true;
        };
        if !plan_newly_assigned {
            return true;
        }
        match self.oracle.is_available(&plan.id) {
            Ok(available) => available,
            Err(err) => {
                warn!(plan = %plan.id.0, error = %err, "availability oracle failed; treating plan as sold out");
                false
            }
        }
    }

    fn capture_history(
        &self,
        before: &Sponsorship,
        staff: &StaffId,
    ) -> Result<EditingHistory, SponsorshipError> {
        let plan = self.resolve_plan(before.plan_id.as_ref())?;
        let organization = self
            .directory
            .organization(&before.organization_id)?
            .ok_or(SponsorshipError::NotFound)?;
        Ok(EditingHistory::capture(
            HistoryId(next_id("hist")),
            before,
            plan.as_ref(),
            &organization,
            staff,
            Utc::now(),
        ))
    }
}

fn new_request(body: String) -> SponsorshipRequest {
    SponsorshipRequest {
        id: RequestId(next_id("req")),
        body,
    }
}

fn apply_patch(current: &Sponsorship, patch: SponsorshipPatch) -> Sponsorship {
    let mut next = current.clone();

    next.plan_id = patch.plan_id;
    next.name = patch.name;
    next.url = patch.url;
    next.profile = patch.profile;
    next.booth_requested = patch.booth_requested;
    next.customization = patch.customization;
    next.customization_name = patch.customization_name;
    next.number_of_additional_attendees = patch.number_of_additional_attendees;
    if let Some(id) = patch.asset_file_id {
        next.asset_file = Some(AssetFile { id });
    }
    if let Some(assigned) = patch.booth_assigned {
        next.booth_assigned = assigned;
    }
    if let Some(suspended) = patch.suspended {
        next.suspended = suspended;
    }
    if let Some(input) = patch.contact {
        next.contact = input.into_contact(current.contact.id.clone());
    }

    match patch.alternate_billing_contact {
        ChildDirective::Upsert(input) => {
            let id = next
                .alternate_billing_contact
                .as_ref()
                .map(|contact| contact.id.clone())
                .unwrap_or_else(|| ContactId(next_id("cnt")));
            next.alternate_billing_contact = Some(input.into_contact(id));
        }
        ChildDirective::Delete => next.alternate_billing_contact = None,
        ChildDirective::NoChange => {}
    }

    apply_request_directive(&mut next.billing_request, patch.billing_request);
    apply_request_directive(&mut next.customization_request, patch.customization_request);
    apply_request_directive(&mut next.note, patch.note);

    next
}

fn apply_request_directive(slot: &mut Option<SponsorshipRequest>, directive: ChildDirective<String>) {
    match directive {
        ChildDirective::Upsert(body) => match slot {
            Some(existing) => existing.body = body,
            None => *slot = Some(new_request(body)),
        },
        ChildDirective::Delete => *slot = None,
        ChildDirective::NoChange => {}
    }
}
