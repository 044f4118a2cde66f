//! Booth-assignment batch planning.
//!
//! Staff submit one decision map per conference. Only sponsorships listed in
//! the map are considered, and only those whose resulting value differs from
//! the current state are mutated; an unlisted sponsorship is never touched.

use std::collections::HashMap;

use serde::Serialize;

use super::domain::{Sponsorship, SponsorshipId};

/// Result of one applied batch: which sponsorships were flipped and which
/// listed decisions were already satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoothAssignmentOutcome {
    pub changed: Vec<SponsorshipId>,
    pub unchanged: Vec<SponsorshipId>,
}

/// Translate the wire form (`"1"` assigns, any other value unassigns) into
/// typed decisions. Sponsorships absent from the form carry no decision.
pub fn decisions_from_form(form: &HashMap<String, String>) -> HashMap<SponsorshipId, bool> {
    form.iter()
        .map(|(id, value)| (SponsorshipId(id.clone()), value == "1"))
        .collect()
}

/// Split a conference's sponsorships into rows to mutate (with the decided
/// value applied) and listed rows that already match their decision.
pub(crate) fn plan_batch(
    sponsorships: Vec<Sponsorship>,
    decisions: &HashMap<SponsorshipId, bool>,
) -> (Vec<Sponsorship>, Vec<SponsorshipId>) {
    let mut to_update = Vec::new();
    let mut unchanged = Vec::new();

    for mut sponsorship in sponsorships {
        let Some(assigned) = decisions.get(&sponsorship.id) else {
            continue;
        };
        if sponsorship.booth_assigned == *assigned {
            unchanged.push(sponsorship.id);
        } else {
            sponsorship.booth_assigned = *assigned;
            to_update.push(sponsorship);
        }
    }

    (to_update, unchanged)
}
