//! Typed account record
//!
//! [`Account::decode`] is the one place raw document fields are read. The
//! defaulting rules live there and nowhere else.

use crate::types::{fields, AuthProfile, Document, Identity};
use chrono::{DateTime, Utc};
use portal_access::{normalize_tier, PlanValue, Tier};
use serde_json::Value;

/// Display name used when the provider has none
pub const ANONYMOUS: &str = "Anonymous";

/// Account record for one identity
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Document id
    pub identity: Identity,
    /// Contact email
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Avatar URL
    pub photo_url: String,
    /// Administrator flag
    pub is_admin: bool,
    /// Stored plan, kept raw until a decision needs it
    pub plan: PlanValue,
    /// First name
    pub name: String,
    /// Surname
    pub surname: String,
    /// Gender
    pub gender: String,
    /// Date of birth, ISO string
    pub dob: String,
    /// Last sign-in
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    /// Decode a stored document, applying field defaults
    #[must_use]
    pub fn decode(identity: Identity, doc: &Document) -> Self {
        Self {
            identity,
            email: text(doc, fields::EMAIL),
            display_name: text(doc, fields::DISPLAY_NAME),
            photo_url: text(doc, fields::PHOTO_URL),
            is_admin: doc.get(fields::IS_ADMIN).and_then(Value::as_bool).unwrap_or(false),
            plan: decode_plan(doc.get(fields::PLAN)),
            name: text(doc, fields::NAME),
            surname: text(doc, fields::SURNAME),
            gender: text(doc, fields::GENDER),
            dob: text(doc, fields::DOB),
            last_login: doc
                .get(fields::LAST_LOGIN)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Fresh account for a first sign-in
    #[must_use]
    pub fn new_for(profile: &AuthProfile) -> Self {
        Self {
            identity: profile.identity.clone(),
            email: profile.email.clone().unwrap_or_default(),
            display_name: profile
                .display_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            photo_url: profile.photo_url.clone().unwrap_or_default(),
            is_admin: false,
            plan: PlanValue::none(),
            name: String::new(),
            surname: String::new(),
            gender: String::new(),
            dob: String::new(),
            last_login: None,
        }
    }

    /// Normalized tier of this account
    #[inline]
    #[must_use]
    pub fn tier(&self) -> Tier {
        normalize_tier(&self.plan)
    }

    /// Encode to the stored document shape
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::EMAIL.into(), self.email.clone().into());
        doc.insert(fields::DISPLAY_NAME.into(), self.display_name.clone().into());
        doc.insert(fields::PHOTO_URL.into(), self.photo_url.clone().into());
        doc.insert(fields::IS_ADMIN.into(), self.is_admin.into());
        doc.insert(fields::PLAN.into(), self.plan.to_stored().into());
        doc.insert(fields::NAME.into(), self.name.clone().into());
        doc.insert(fields::SURNAME.into(), self.surname.clone().into());
        doc.insert(fields::GENDER.into(), self.gender.clone().into());
        doc.insert(fields::DOB.into(), self.dob.clone().into());
        if let Some(ts) = self.last_login {
            doc.insert(fields::LAST_LOGIN.into(), ts.to_rfc3339().into());
        }
        doc
    }
}

fn text(doc: &Document, field: &str) -> String {
    doc.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode_plan(value: Option<&Value>) -> PlanValue {
    match value {
        Some(Value::String(s)) if !s.is_empty() => PlanValue::Text(s.clone()),
        Some(v @ Value::Number(_)) => PlanValue::from(v),
        _ => PlanValue::none(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Fields to merge into an existing record so it carries every default
///
/// Only fields that are blank (or, for the personal fields, entirely absent)
/// are filled. Existing values are never overwritten.
#[must_use]
pub fn missing_fields(existing: &Document, profile: &AuthProfile) -> Document {
    let mut patch = Document::new();

    if is_blank(existing.get(fields::EMAIL)) {
        if let Some(email) = &profile.email {
            patch.insert(fields::EMAIL.into(), email.clone().into());
        }
    }
    if is_blank(existing.get(fields::DISPLAY_NAME)) {
        let name = profile
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        patch.insert(fields::DISPLAY_NAME.into(), name.into());
    }
    if is_blank(existing.get(fields::PHOTO_URL)) {
        patch.insert(
            fields::PHOTO_URL.into(),
            profile.photo_url.clone().unwrap_or_default().into(),
        );
    }
    if !existing.contains_key(fields::IS_ADMIN) {
        patch.insert(fields::IS_ADMIN.into(), false.into());
    }
    // A numeric 0 plan is a real value, only text blanks count as missing
    match existing.get(fields::PLAN) {
        None | Some(Value::Null) => {
            patch.insert(fields::PLAN.into(), portal_access::NO_PLAN.into());
        }
        Some(Value::String(s)) if s.is_empty() => {
            patch.insert(fields::PLAN.into(), portal_access::NO_PLAN.into());
        }
        _ => {}
    }
    for field in [fields::NAME, fields::SURNAME, fields::GENDER, fields::DOB] {
        if !existing.contains_key(field) {
            patch.insert(field.into(), "".into());
        }
    }

    patch
}

/// Partial profile edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// New display name
    pub display_name: Option<String>,
    /// New first name
    pub name: Option<String>,
    /// New surname
    pub surname: Option<String>,
    /// New gender
    pub gender: Option<String>,
    /// New date of birth
    pub dob: Option<String>,
}

impl ProfilePatch {
    /// Check if nothing would change
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_document().is_empty()
    }

    /// Fields to write
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (field, value) in [
            (fields::DISPLAY_NAME, &self.display_name),
            (fields::NAME, &self.name),
            (fields::SURNAME, &self.surname),
            (fields::GENDER, &self.gender),
            (fields::DOB, &self.dob),
        ] {
            if let Some(v) = value {
                doc.insert(field.into(), v.clone().into());
            }
        }
        doc
    }
}
