//! Sponsorship lifecycle, dual-context validation, booth assignment, and
//! editing-history core.

pub mod booth;
pub mod directory;
pub mod domain;
pub mod history;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use booth::{decisions_from_form, BoothAssignmentOutcome};
pub use directory::{
    CapacityOracle, InMemoryDirectory, OracleError, PlanAvailabilityOracle, SponsorshipDirectory,
    StoreError,
};
pub use domain::{
    email_domain, AssetFile, AssetFileId, ChildDirective, Conference, ConferenceId, Contact,
    ContactId, ContactInput, Organization, OrganizationId, Plan, PlanId, RequestId, Sponsorship,
    SponsorshipId, SponsorshipRequest, SponsorshipSummary, StaffId,
};
pub use history::{EditingHistory, HistoryId, HistoryProcessor, LoggingHistoryProcessor};
pub use router::sponsorship_router;
pub use service::{
    SponsorshipApplication, SponsorshipError, SponsorshipPatch, SponsorshipService,
};
pub use validation::{validate, ActorContext, RuleInput, Violation, ViolationKind};
