//! Dual-context validation pipeline.
//!
//! Rules run in a fixed order and each rule declares the actor contexts it
//! participates in, so the bypass scope of a staff override is auditable
//! rather than implicit. Structural rules (organization uniqueness, contact
//! presence, plan/conference match) hold in every context; business rules
//! guard the self-service flow only.

use serde::{Deserialize, Serialize};

use super::domain::{Plan, Sponsorship};

/// Who is driving the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorContext {
    /// Sponsor-initiated change through the application form.
    SelfService,
    /// Staff-initiated technical correction.
    StaffOverride,
}

/// Classification of a failed rule, independent of the offending field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Presence,
    Uniqueness,
    PlanMismatch,
    PlanSoldOut,
    BoothNotEligible,
    ProfileTooLong,
}

/// A single rule failure, addressed to the field a form would re-display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(field: &'static str, kind: ViolationKind) -> Self {
        Self { field, kind }
    }
}

/// Facts the rules consume, resolved by the service before validation so the
/// rules themselves stay pure. `plan` is the resolved proposed plan;
/// `plan_available` is only meaningful when `plan_newly_assigned` is true.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub proposed: &'a Sponsorship,
    pub creating: bool,
    pub policy_agreement: bool,
    pub organization_taken: bool,
    pub plan: Option<&'a Plan>,
    pub plan_newly_assigned: bool,
    pub plan_available: bool,
    pub booth_newly_requested: bool,
}

struct Rule {
    contexts: &'static [ActorContext],
    check: fn(&RuleInput<'_>) -> Option<Violation>,
}

const EVERY_CONTEXT: &[ActorContext] = &[ActorContext::SelfService, ActorContext::StaffOverride];
const SELF_SERVICE: &[ActorContext] = &[ActorContext::SelfService];

static RULES: &[Rule] = &[
    Rule {
        contexts: EVERY_CONTEXT,
        check: organization_unique,
    },
    Rule {
        contexts: EVERY_CONTEXT,
        check: primary_contact_present,
    },
    Rule {
        contexts: EVERY_CONTEXT,
        check: plan_matches_conference,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: plan_has_capacity,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: booth_on_eligible_plan,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: profile_within_word_limit,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: policy_agreed,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: asset_file_present,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: name_present,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: url_present,
    },
    Rule {
        contexts: SELF_SERVICE,
        check: profile_present,
    },
];

/// Run every rule active in `context` against the proposed state, in order.
pub fn validate(input: &RuleInput<'_>, context: ActorContext) -> Vec<Violation> {
    RULES
        .iter()
        .filter(|rule| rule.contexts.contains(&context))
        .filter_map(|rule| (rule.check)(input))
        .collect()
}

fn organization_unique(input: &RuleInput<'_>) -> Option<Violation> {
    input
        .organization_taken
        .then(|| Violation::new("organization", ViolationKind::Uniqueness))
}

fn primary_contact_present(input: &RuleInput<'_>) -> Option<Violation> {
    let contact = &input.proposed.contact;
    (contact.email.trim().is_empty() || contact.name.trim().is_empty())
        .then(|| Violation::new("contact", ViolationKind::Presence))
}

fn plan_matches_conference(input: &RuleInput<'_>) -> Option<Violation> {
    let plan = input.plan?;
    (plan.conference_id != input.proposed.conference_id)
        .then(|| Violation::new("plan", ViolationKind::PlanMismatch))
}

fn plan_has_capacity(input: &RuleInput<'_>) -> Option<Violation> {
    // Only a newly set or changed plan reference is checked; a plan that
    // sells out later does not invalidate existing holders.
    (input.plan_newly_assigned && input.plan.is_some() && !input.plan_available)
        .then(|| Violation::new("plan", ViolationKind::PlanSoldOut))
}

fn booth_on_eligible_plan(input: &RuleInput<'_>) -> Option<Violation> {
    let eligible = input.plan.map(Plan::booth_eligible).unwrap_or(false);
    (input.booth_newly_requested && !eligible)
        .then(|| Violation::new("booth_requested", ViolationKind::BoothNotEligible))
}

fn profile_within_word_limit(input: &RuleInput<'_>) -> Option<Violation> {
    let limit = input.plan.and_then(|plan| plan.word_limit_hard)?;
    (input.proposed.word_count() > limit as usize)
        .then(|| Violation::new("profile", ViolationKind::ProfileTooLong))
}

fn policy_agreed(input: &RuleInput<'_>) -> Option<Violation> {
    (input.creating && !input.policy_agreement)
        .then(|| Violation::new("policy_agreement", ViolationKind::Presence))
}

fn asset_file_present(input: &RuleInput<'_>) -> Option<Violation> {
    input
        .proposed
        .asset_file
        .is_none()
        .then(|| Violation::new("asset_file", ViolationKind::Presence))
}

fn name_present(input: &RuleInput<'_>) -> Option<Violation> {
    input
        .proposed
        .name
        .trim()
        .is_empty()
        .then(|| Violation::new("name", ViolationKind::Presence))
}

fn url_present(input: &RuleInput<'_>) -> Option<Violation> {
    input
        .proposed
        .url
        .trim()
        .is_empty()
        .then(|| Violation::new("url", ViolationKind::Presence))
}

fn profile_present(input: &RuleInput<'_>) -> Option<Violation> {
    input
        .proposed
        .profile
        .trim()
        .is_empty()
        .then(|| Violation::new("profile", ViolationKind::Presence))
}
