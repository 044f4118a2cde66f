use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Identifier wrapper for conferences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConferenceId(pub String);

/// Identifier wrapper for sponsorship plans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

/// Identifier wrapper for sponsoring organizations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Identifier wrapper for sponsorship applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SponsorshipId(pub String);

/// Identifier wrapper for staff members reviewing applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

/// Identifier wrapper for contact rows owned by a sponsorship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

/// Identifier wrapper for request rows owned by a sponsorship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Identifier wrapper for uploaded asset files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetFileId(pub String);

/// A conference accepting sponsorship applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    pub slug: String,
    pub name: String,
    pub contact_email_address: String,
}

/// A sponsorship tier: capacity, included guests, booth eligibility, word limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub conference_id: ConferenceId,
    pub name: String,
    pub rank: u32,
    /// `None` means the plan is not capacity limited.
    pub capacity: Option<u32>,
    pub number_of_guests: u32,
    /// Zero means the plan carries no exhibition booth.
    pub booth_size: u32,
    /// Hard ceiling on the sponsor profile word count; `None` means unlimited.
    pub word_limit_hard: Option<u32>,
}

impl Plan {
    pub fn booth_eligible(&self) -> bool {
        self.booth_size > 0
    }
}

/// A sponsoring organization, keyed by its email domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub domain: String,
}

impl Organization {
    pub fn slug(&self) -> &str {
        &self.domain
    }
}

/// A contact person attached to a sponsorship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub organization: String,
    pub unit: String,
    pub address: String,
}

impl Contact {
    pub(crate) fn summary(&self) -> Value {
        json!({
            "id": self.id.0,
            "name": self.name,
            "email": self.email,
            "organization": self.organization,
            "unit": self.unit,
            "address": self.address,
        })
    }
}

/// Contact fields as supplied by a form, before an id is minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub unit: String,
    pub address: String,
}

impl ContactInput {
    pub(crate) fn into_contact(self, id: ContactId) -> Contact {
        Contact {
            id,
            name: self.name,
            email: self.email,
            organization: self.organization,
            unit: self.unit,
            address: self.address,
        }
    }
}

/// A free-text request row (billing instructions, customization wishes, staff note).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipRequest {
    pub id: RequestId,
    pub body: String,
}

/// Reference to an uploaded asset (logo archive etc.); blob storage is external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    pub id: AssetFileId,
}

/// Per-child update directive. Omission (`NoChange`) never deletes an
/// existing child; deletion must be requested explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildDirective<T> {
    Upsert(T),
    Delete,
    #[default]
    NoChange,
}

/// One organization's application to sponsor one conference under one plan,
/// together with its owned contact/request/asset children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsorship {
    pub id: SponsorshipId,
    pub conference_id: ConferenceId,
    pub organization_id: OrganizationId,
    pub plan_id: Option<PlanId>,
    pub name: String,
    pub url: String,
    pub profile: String,
    pub locale: String,
    pub booth_requested: bool,
    pub booth_assigned: bool,
    pub suspended: bool,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub customization: bool,
    pub customization_name: Option<String>,
    pub number_of_additional_attendees: Option<u32>,
    pub asset_file: Option<AssetFile>,
    pub contact: Contact,
    pub alternate_billing_contact: Option<Contact>,
    pub billing_request: Option<SponsorshipRequest>,
    pub customization_request: Option<SponsorshipRequest>,
    pub note: Option<SponsorshipRequest>,
}

impl Sponsorship {
    /// A sponsorship stays active until it is withdrawn.
    pub fn active(&self) -> bool {
        self.withdrawn_at.is_none()
    }

    /// Alternate billing contact when present, otherwise the primary contact.
    pub fn billing_contact(&self) -> &Contact {
        self.alternate_billing_contact.as_ref().unwrap_or(&self.contact)
    }

    /// True iff customization is planned and a customization name is set.
    pub fn is_customized(&self) -> bool {
        self.customization
            && self
                .customization_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty())
    }

    /// Customization name when customized, otherwise the plan name.
    pub fn plan_display_name(&self, plan: Option<&Plan>) -> Option<String> {
        if self.is_customized() {
            self.customization_name.clone()
        } else {
            plan.map(|plan| plan.name.clone())
        }
    }

    /// Whitespace-delimited token count of the sponsor profile text.
    pub fn word_count(&self) -> usize {
        self.profile.split_whitespace().count()
    }

    /// Plan-included guests plus additional attendees (absent treated as zero).
    pub fn total_attendees(&self, plan: Option<&Plan>) -> u32 {
        let included = plan.map(|plan| plan.number_of_guests).unwrap_or(0);
        included + self.number_of_additional_attendees.unwrap_or(0)
    }

    /// Booth size granted by the plan, zero unless a booth is assigned.
    pub fn effective_booth_size(&self, plan: Option<&Plan>) -> u32 {
        if self.booth_assigned {
            plan.map(|plan| plan.booth_size).unwrap_or(0)
        } else {
            0
        }
    }

    /// One-way withdrawal: stamps `withdrawn_at` and clears the booth and plan.
    /// Repeated calls refresh the timestamp and re-assert the cleared fields.
    pub fn withdraw(&mut self, now: DateTime<Utc>) {
        self.withdrawn_at = Some(now);
        self.booth_assigned = false;
        self.plan_id = None;
    }

    /// Audit-trail representation with a fixed key set. The key set is a
    /// compatibility contract for editing-history consumers; `withdrawn_at`
    /// appears only when set.
    pub fn snapshot(&self, plan: Option<&Plan>, organization: &Organization) -> Value {
        let mut map = Map::new();
        map.insert("conference_id".to_string(), json!(self.conference_id.0));
        map.insert("contact".to_string(), self.contact.summary());
        map.insert(
            "alternate_billing_contact".to_string(),
            self.alternate_billing_contact
                .as_ref()
                .map(Contact::summary)
                .unwrap_or(Value::Null),
        );
        map.insert(
            "billing_request".to_string(),
            json!(self.billing_request.as_ref().map(|r| r.body.clone())),
        );
        map.insert(
            "plan_id".to_string(),
            json!(self.plan_id.as_ref().map(|id| id.0.clone())),
        );
        map.insert(
            "plan_name".to_string(),
            json!(plan.map(|plan| plan.name.clone())),
        );
        map.insert(
            "plan_display_name".to_string(),
            json!(self.plan_display_name(plan)),
        );
        map.insert(
            "customization_name".to_string(),
            json!(self.customization_name),
        );
        map.insert("customized".to_string(), json!(self.is_customized()));
        map.insert("suspended".to_string(), json!(self.suspended));
        map.insert(
            "customization_planned".to_string(),
            json!(self.customization),
        );
        map.insert(
            "customization_request".to_string(),
            json!(self.customization_request.as_ref().map(|r| r.body.clone())),
        );
        map.insert("booth_requested".to_string(), json!(self.booth_requested));
        map.insert("booth_assigned".to_string(), json!(self.booth_assigned));
        map.insert("name".to_string(), json!(self.name));
        map.insert("url".to_string(), json!(self.url));
        map.insert("profile".to_string(), json!(self.profile));
        map.insert("organization_id".to_string(), json!(organization.id.0));
        map.insert("organization_name".to_string(), json!(organization.name));
        map.insert("locale".to_string(), json!(self.locale));
        map.insert(
            "asset_file_id".to_string(),
            json!(self.asset_file.as_ref().map(|asset| asset.id.0.clone())),
        );
        map.insert(
            "note".to_string(),
            json!(self.note.as_ref().map(|r| r.body.clone())),
        );
        map.insert(
            "number_of_additional_attendees".to_string(),
            json!(self.number_of_additional_attendees),
        );
        if let Some(withdrawn_at) = self.withdrawn_at {
            map.insert("withdrawn_at".to_string(), json!(withdrawn_at));
        }
        Value::Object(map)
    }

    /// API-facing projection of the record and its derived queries.
    pub fn summary(&self, plan: Option<&Plan>) -> SponsorshipSummary {
        SponsorshipSummary {
            id: self.id.clone(),
            conference_id: self.conference_id.clone(),
            organization_id: self.organization_id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            plan_id: self.plan_id.clone(),
            plan_display_name: self.plan_display_name(plan),
            booth_requested: self.booth_requested,
            booth_assigned: self.booth_assigned,
            effective_booth_size: self.effective_booth_size(plan),
            total_attendees: self.total_attendees(plan),
            suspended: self.suspended,
            withdrawn_at: self.withdrawn_at,
            locale: self.locale.clone(),
        }
    }
}

/// Sanitized representation of a sponsorship exposed through the API.
#[derive(Debug, Clone, Serialize)]
pub struct SponsorshipSummary {
    pub id: SponsorshipId,
    pub conference_id: ConferenceId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub url: String,
    pub plan_id: Option<PlanId>,
    pub plan_display_name: Option<String>,
    pub booth_requested: bool,
    pub booth_assigned: bool,
    pub effective_booth_size: u32,
    pub total_attendees: u32,
    pub suspended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub locale: String,
}

/// Domain part of the primary contact's email address, used to assume the
/// sponsoring organization when none is given.
pub fn email_domain(email: &str) -> Option<&str> {
    email
        .split_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.trim().is_empty())
}
