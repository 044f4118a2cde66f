use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    AssetFileId, Conference, ConferenceId, Organization, OrganizationId, Plan, PlanId, Sponsorship,
    SponsorshipId,
};
use super::history::EditingHistory;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the conference/plan/organization/sponsorship
/// tables so the service module can be exercised in isolation.
pub trait SponsorshipDirectory: Send + Sync {
    fn conference(&self, id: &ConferenceId) -> Result<Option<Conference>, StoreError>;
    fn conference_by_slug(&self, slug: &str) -> Result<Option<Conference>, StoreError>;
    fn plan(&self, id: &PlanId) -> Result<Option<Plan>, StoreError>;
    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, StoreError>;
    fn organization_by_domain(&self, domain: &str) -> Result<Option<Organization>, StoreError>;
    fn insert_organization(&self, organization: Organization) -> Result<(), StoreError>;
    fn sponsorship(&self, id: &SponsorshipId) -> Result<Option<Sponsorship>, StoreError>;
    fn sponsorships_for_conference(
        &self,
        conference_id: &ConferenceId,
    ) -> Result<Vec<Sponsorship>, StoreError>;
    fn insert_sponsorship(&self, sponsorship: Sponsorship) -> Result<(), StoreError>;
    fn update_sponsorship(&self, sponsorship: Sponsorship) -> Result<(), StoreError>;
    /// Persist every row or none; a missing row fails the whole batch.
    fn update_sponsorships(&self, batch: Vec<Sponsorship>) -> Result<(), StoreError>;
    fn append_history(&self, history: EditingHistory) -> Result<(), StoreError>;
    fn histories_for_sponsorship(
        &self,
        sponsorship_id: &SponsorshipId,
    ) -> Result<Vec<EditingHistory>, StoreError>;
    fn asset_download_url(&self, id: &AssetFileId) -> Result<Option<String>, StoreError>;
}

/// Remaining-capacity oracle for a plan. Occupancy counts active,
/// plan-holding, non-suspended sponsorships against the plan's capacity.
pub trait PlanAvailabilityOracle: Send + Sync {
    fn is_available(&self, plan_id: &PlanId) -> Result<bool, OracleError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("availability oracle timed out")]
    Timeout,
    #[error("availability oracle unavailable: {0}")]
    Unavailable(String),
}

/// Oracle computing occupancy straight from a directory.
pub struct CapacityOracle<D> {
    directory: Arc<D>,
}

impl<D> CapacityOracle<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }
}

impl<D: SponsorshipDirectory> PlanAvailabilityOracle for CapacityOracle<D> {
    fn is_available(&self, plan_id: &PlanId) -> Result<bool, OracleError> {
        let plan = self
            .directory
            .plan(plan_id)
            .map_err(|err| OracleError::Unavailable(err.to_string()))?
            .ok_or_else(|| OracleError::Unavailable(format!("unknown plan {}", plan_id.0)))?;

        let Some(capacity) = plan.capacity else {
            return Ok(true);
        };

        let holders = self
            .directory
            .sponsorships_for_conference(&plan.conference_id)
            .map_err(|err| OracleError::Unavailable(err.to_string()))?
            .iter()
            .filter(|s| s.active() && !s.suspended && s.plan_id.as_ref() == Some(plan_id))
            .count();

        Ok((holders as u32) < capacity)
    }
}

#[derive(Default)]
struct DirectoryState {
    conferences: BTreeMap<String, Conference>,
    plans: BTreeMap<String, Plan>,
    organizations: BTreeMap<String, Organization>,
    sponsorships: BTreeMap<String, Sponsorship>,
    histories: Vec<EditingHistory>,
    assets: BTreeMap<String, String>,
}

/// In-memory directory holding every table behind one lock, matching the
/// single-logical-writer model the service assumes.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_conference(&self, conference: Conference) {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state
            .conferences
            .insert(conference.id.0.clone(), conference);
    }

    pub fn put_plan(&self, plan: Plan) {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.plans.insert(plan.id.0.clone(), plan);
    }

    pub fn put_organization(&self, organization: Organization) {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state
            .organizations
            .insert(organization.id.0.clone(), organization);
    }

    /// Register an uploaded asset and the URL it can be fetched from.
    pub fn register_asset(&self, id: AssetFileId, download_url: impl Into<String>) {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.assets.insert(id.0, download_url.into());
    }
}

impl SponsorshipDirectory for InMemoryDirectory {
    fn conference(&self, id: &ConferenceId) -> Result<Option<Conference>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.conferences.get(&id.0).cloned())
    }

    fn conference_by_slug(&self, slug: &str) -> Result<Option<Conference>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state
            .conferences
            .values()
            .find(|conference| conference.slug == slug)
            .cloned())
    }

    fn plan(&self, id: &PlanId) -> Result<Option<Plan>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.plans.get(&id.0).cloned())
    }

    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.organizations.get(&id.0).cloned())
    }

    fn organization_by_domain(&self, domain: &str) -> Result<Option<Organization>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state
            .organizations
            .values()
            .find(|organization| organization.domain == domain)
            .cloned())
    }

    fn insert_organization(&self, organization: Organization) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        if state.organizations.contains_key(&organization.id.0) {
            return Err(StoreError::Conflict);
        }
        state
            .organizations
            .insert(organization.id.0.clone(), organization);
        Ok(())
    }

    fn sponsorship(&self, id: &SponsorshipId) -> Result<Option<Sponsorship>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.sponsorships.get(&id.0).cloned())
    }

    fn sponsorships_for_conference(
        &self,
        conference_id: &ConferenceId,
    ) -> Result<Vec<Sponsorship>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state
            .sponsorships
            .values()
            .filter(|sponsorship| &sponsorship.conference_id == conference_id)
            .cloned()
            .collect())
    }

    fn insert_sponsorship(&self, sponsorship: Sponsorship) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        if state.sponsorships.contains_key(&sponsorship.id.0) {
            return Err(StoreError::Conflict);
        }
        state
            .sponsorships
            .insert(sponsorship.id.0.clone(), sponsorship);
        Ok(())
    }

    fn update_sponsorship(&self, sponsorship: Sponsorship) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        if !state.sponsorships.contains_key(&sponsorship.id.0) {
            return Err(StoreError::NotFound);
        }
        state
            .sponsorships
            .insert(sponsorship.id.0.clone(), sponsorship);
        Ok(())
    }

    fn update_sponsorships(&self, batch: Vec<Sponsorship>) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        if batch
            .iter()
            .any(|sponsorship| !state.sponsorships.contains_key(&sponsorship.id.0))
        {
            return Err(StoreError::NotFound);
        }
        for sponsorship in batch {
            state
                .sponsorships
                .insert(sponsorship.id.0.clone(), sponsorship);
        }
        Ok(())
    }

    fn append_history(&self, history: EditingHistory) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.histories.push(history);
        Ok(())
    }

    fn histories_for_sponsorship(
        &self,
        sponsorship_id: &SponsorshipId,
    ) -> Result<Vec<EditingHistory>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state
            .histories
            .iter()
            .filter(|history| &history.sponsorship_id == sponsorship_id)
            .cloned()
            .collect())
    }

    fn asset_download_url(&self, id: &AssetFileId) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(state.assets.get(&id.0).cloned())
    }
}
