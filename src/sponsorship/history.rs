//! Editing history capture and asynchronous processor hand-off.
//!
//! A history row records the state a sponsorship had before a
//! staff-attributed mutation. The row is persisted in the same commit as the
//! mutation; the processor is only notified afterwards, so it can always load
//! a consistent snapshot by id even under at-least-once delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::domain::{Organization, Plan, Sponsorship, SponsorshipId, StaffId};

/// Identifier wrapper for editing-history rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub String);

/// Immutable snapshot of a sponsorship taken at a staff-attributed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditingHistory {
    pub id: HistoryId,
    pub sponsorship_id: SponsorshipId,
    pub actor_id: StaffId,
    pub snapshot: Value,
    pub created_at: DateTime<Utc>,
}

impl EditingHistory {
    /// Capture the pre-mutation state of `sponsorship`, attributed to `actor`.
    pub fn capture(
        id: HistoryId,
        sponsorship: &Sponsorship,
        plan: Option<&Plan>,
        organization: &Organization,
        actor: &StaffId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sponsorship_id: sponsorship.id.clone(),
            actor_id: actor.clone(),
            snapshot: sponsorship.snapshot(plan, organization),
            created_at,
        }
    }
}

/// Fire-and-forget hand-off to the external editing-history processor. The
/// processor accepts a history id and eventually consumes the persisted
/// snapshot; it must tolerate at-least-once delivery.
pub trait HistoryProcessor: Send + Sync {
    fn notify(&self, history_id: &HistoryId);
}

/// Processor hand-off that only logs the queued id. Stands in for the real
/// job queue in local runs.
#[derive(Debug, Default, Clone)]
pub struct LoggingHistoryProcessor;

impl HistoryProcessor for LoggingHistoryProcessor {
    fn notify(&self, history_id: &HistoryId) {
        info!(history_id = %history_id.0, "editing history queued for processing");
    }
}
