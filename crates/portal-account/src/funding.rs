//! Funding applications
//!
//! Business owners submit an [`ApplicationForm`]; administrators move the
//! resulting [`FundingApplication`] through review. Like accounts, raw
//! documents are decoded once in [`FundingApplication::decode`] and every
//! missing field gets an explicit default there.

use crate::account::Account;
use crate::error::AccountError;
use crate::store::DocumentStore;
use crate::types::{AuthProfile, Document, Identity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Collection holding funding applications
pub const FUNDING_COLLECTION: &str = "funding";

/// Stored field names of a funding application
pub mod fields {
    /// Business name
    pub const BUSINESS_NAME: &str = "businessName";
    /// Business category
    pub const CATEGORY: &str = "category";
    /// What the funding is for
    pub const DESCRIPTION: &str = "description";
    /// Business address
    pub const ADDRESS: &str = "address";
    /// Contact number
    pub const NUMBER: &str = "number";
    /// Submitting identity
    pub const USER_ID: &str = "userId";
    /// Applicant first name
    pub const NAME: &str = "Name";
    /// Applicant surname
    pub const SURNAME: &str = "Surname";
    /// Applicant email
    pub const EMAIL: &str = "email";
    /// Review status
    pub const STATUS: &str = "status";
    /// Reviewer feedback
    pub const FEEDBACK: &str = "feedback";
    /// Submission timestamp
    pub const SUBMISSION_DATE: &str = "submissionDate";
    /// Reviewing administrator
    pub const REVIEWER_ID: &str = "reviewerId";
    /// Reviewer display name
    pub const REVIEWER_NAME: &str = "reviewerName";
    /// Review timestamp
    pub const REVIEW_DATE: &str = "reviewDate";
    /// Last change
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Where an application sits in review
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Saved but not submitted
    Draft,
    /// Submitted, waiting for an administrator
    Pending,
    /// An administrator is looking at it
    UnderReview,
    /// Funding granted
    Approved,
    /// Funding declined
    Rejected,
}

impl ApplicationStatus {
    /// Every status, in review order
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
    ];

    /// Stored form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the stored form, `None` for anything unknown
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw.trim())
    }

    /// Review decided the application
    #[inline]
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Whether a review may move an application from `self` to `target`
    ///
    /// Drafts are invisible to reviewers. Once submitted, an application can
    /// be picked up, decided, or have its decision revised; it never goes
    /// back to draft or pending.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        use ApplicationStatus::{Approved, Pending, Rejected, UnderReview};
        matches!(
            (self, target),
            (Pending | UnderReview | Approved | Rejected, UnderReview | Approved | Rejected)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an owner fills in to apply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    /// Business name
    pub business_name: String,
    /// Business category
    pub category: String,
    /// What the funding is for
    pub description: String,
    /// Business address
    pub address: String,
    /// Contact number
    pub number: String,
}

impl ApplicationForm {
    /// Reject forms with a blank field
    ///
    /// # Errors
    /// `AccountError::InvalidApplication` naming the first blank field.
    pub fn validate(&self) -> Result<(), AccountError> {
        let required = [
            ("business name", &self.business_name),
            ("category", &self.category),
            ("description", &self.description),
            ("address", &self.address),
            ("contact number", &self.number),
        ];
        match required.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((label, _)) => Err(AccountError::InvalidApplication(format!("{label} is required"))),
            None => Ok(()),
        }
    }
}

/// Stored funding application
#[derive(Debug, Clone, PartialEq)]
pub struct FundingApplication {
    /// Document id
    pub id: String,
    /// Submitting identity
    pub user_id: Identity,
    /// Applicant first name
    pub name: String,
    /// Applicant surname
    pub surname: String,
    /// Applicant email
    pub email: String,
    /// Business name
    pub business_name: String,
    /// Business category
    pub category: String,
    /// What the funding is for
    pub description: String,
    /// Business address
    pub address: String,
    /// Contact number
    pub number: String,
    /// Review status, `Pending` when missing or unknown
    pub status: ApplicationStatus,
    /// Reviewer feedback
    pub feedback: String,
    /// When it was submitted
    pub submitted_at: Option<DateTime<Utc>>,
    /// Reviewing administrator
    pub reviewer_id: Option<Identity>,
    /// Reviewer display name
    pub reviewer_name: String,
    /// When it was last reviewed
    pub review_date: Option<DateTime<Utc>>,
    /// Last change
    pub updated_at: Option<DateTime<Utc>>,
}

impl FundingApplication {
    /// Decode a stored document, applying field defaults
    #[must_use]
    pub fn decode(id: impl Into<String>, doc: &Document) -> Self {
        Self {
            id: id.into(),
            user_id: Identity::new(text(doc, fields::USER_ID)),
            name: text(doc, fields::NAME),
            surname: text(doc, fields::SURNAME),
            email: text(doc, fields::EMAIL),
            business_name: text(doc, fields::BUSINESS_NAME),
            category: text(doc, fields::CATEGORY),
            description: text(doc, fields::DESCRIPTION),
            address: text(doc, fields::ADDRESS),
            number: text(doc, fields::NUMBER),
            status: doc
                .get(fields::STATUS)
                .and_then(Value::as_str)
                .and_then(ApplicationStatus::parse)
                .unwrap_or(ApplicationStatus::Pending),
            feedback: text(doc, fields::FEEDBACK),
            submitted_at: timestamp(doc, fields::SUBMISSION_DATE),
            reviewer_id: doc
                .get(fields::REVIEWER_ID)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(Identity::new),
            reviewer_name: text(doc, fields::REVIEWER_NAME),
            review_date: timestamp(doc, fields::REVIEW_DATE),
            updated_at: timestamp(doc, fields::UPDATED_AT),
        }
    }

    /// Applicant's full name
    #[must_use]
    pub fn applicant(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

fn text(doc: &Document, field: &str) -> String {
    doc.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn timestamp(doc: &Document, field: &str) -> Option<DateTime<Utc>> {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// An administrator's verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Target status
    pub status: ApplicationStatus,
    /// Message for the applicant
    pub feedback: String,
}

impl Review {
    /// Create review
    #[must_use]
    pub fn new(status: ApplicationStatus, feedback: impl Into<String>) -> Self {
        Self {
            status,
            feedback: feedback.into(),
        }
    }

    /// Check the review against the application's current status
    ///
    /// # Errors
    /// `InvalidTransition` when the move is not allowed, `FeedbackRequired`
    /// when a final decision carries no feedback.
    pub fn check(&self, current: ApplicationStatus) -> Result<(), AccountError> {
        if !current.can_transition_to(self.status) {
            return Err(AccountError::InvalidTransition {
                from: current,
                to: self.status,
            });
        }
        if self.status.is_final() && self.feedback.trim().is_empty() {
            return Err(AccountError::FeedbackRequired(self.status));
        }
        Ok(())
    }
}

/// Number of applications per status, every status present
#[must_use]
pub fn status_counts(applications: &[FundingApplication]) -> BTreeMap<ApplicationStatus, usize> {
    let mut counts: BTreeMap<_, _> = ApplicationStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    for application in applications {
        *counts.entry(application.status).or_insert(0) += 1;
    }
    counts
}

/// Funding applications over a [`DocumentStore`]
#[derive(Clone)]
pub struct FundingApplications {
    store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for FundingApplications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FundingApplications").finish_non_exhaustive()
    }
}

impl FundingApplications {
    /// Create over `store`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Submit a new application as `applicant`
    ///
    /// The applicant's display name is split into first name and surname on
    /// the first space.
    ///
    /// # Errors
    /// `InvalidApplication` for a blank field, or a store failure.
    pub async fn submit(
        &self,
        applicant: &AuthProfile,
        form: &ApplicationForm,
    ) -> Result<FundingApplication, AccountError> {
        form.validate()?;
        let display = applicant.display_name.as_deref().unwrap_or_default().trim();
        let (name, surname) = display.split_once(' ').unwrap_or((display, ""));
        let now = Utc::now().to_rfc3339();

        let mut doc = Document::new();
        doc.insert(fields::BUSINESS_NAME.into(), form.business_name.trim().into());
        doc.insert(fields::CATEGORY.into(), form.category.trim().into());
        doc.insert(fields::DESCRIPTION.into(), form.description.trim().into());
        doc.insert(fields::ADDRESS.into(), form.address.trim().into());
        doc.insert(fields::NUMBER.into(), form.number.trim().into());
        doc.insert(fields::USER_ID.into(), applicant.identity.as_str().into());
        doc.insert(fields::NAME.into(), name.into());
        doc.insert(fields::SURNAME.into(), surname.trim().into());
        doc.insert(fields::EMAIL.into(), applicant.email.clone().unwrap_or_default().into());
        doc.insert(fields::STATUS.into(), ApplicationStatus::Pending.as_str().into());
        doc.insert(fields::FEEDBACK.into(), "".into());
        doc.insert(fields::SUBMISSION_DATE.into(), now.into());

        let id = self.store.add(FUNDING_COLLECTION, doc.clone()).await?;
        tracing::info!(%id, applicant = %applicant.identity, "funding application submitted");
        Ok(FundingApplication::decode(id, &doc))
    }

    /// One application by id
    ///
    /// # Errors
    /// Store failure.
    pub async fn get(&self, id: &str) -> Result<Option<FundingApplication>, AccountError> {
        Ok(self
            .store
            .get(FUNDING_COLLECTION, id)
            .await?
            .map(|doc| FundingApplication::decode(id, &doc)))
    }

    /// Applications, newest first, optionally only those in `filter`
    ///
    /// # Errors
    /// Store failure.
    pub async fn list(&self, filter: Option<ApplicationStatus>) -> Result<Vec<FundingApplication>, AccountError> {
        let mut applications: Vec<FundingApplication> = self
            .store
            .list(FUNDING_COLLECTION)
            .await?
            .into_iter()
            .map(|(id, doc)| FundingApplication::decode(id, &doc))
            .filter(|a| filter.map_or(true, |s| a.status == s))
            .collect();
        applications.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(applications)
    }

    /// Applications submitted by `owner`, newest first
    ///
    /// # Errors
    /// Store failure.
    pub async fn list_for(&self, owner: &Identity) -> Result<Vec<FundingApplication>, AccountError> {
        let mut applications = self.list(None).await?;
        applications.retain(|a| &a.user_id == owner);
        Ok(applications)
    }

    /// Record `review` by `reviewer` on application `id`
    ///
    /// Callers are expected to have checked the reviewer's rights; see
    /// [`AdminConsole::review_application`](crate::AdminConsole::review_application).
    ///
    /// # Errors
    /// `ApplicationNotFound`, `InvalidTransition`, `FeedbackRequired` or a
    /// store failure.
    pub async fn review(
        &self,
        id: &str,
        reviewer: &Account,
        review: &Review,
    ) -> Result<FundingApplication, AccountError> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| AccountError::ApplicationNotFound(id.to_string()))?;
        review.check(current.status)?;

        let reviewer_name = if reviewer.display_name.trim().is_empty() {
            reviewer.email.clone()
        } else {
            reviewer.display_name.clone()
        };
        let now = Utc::now().to_rfc3339();
        let mut patch = Document::new();
        patch.insert(fields::STATUS.into(), review.status.as_str().into());
        patch.insert(fields::FEEDBACK.into(), review.feedback.trim().into());
        patch.insert(fields::REVIEWER_ID.into(), reviewer.identity.as_str().into());
        patch.insert(fields::REVIEWER_NAME.into(), reviewer_name.into());
        patch.insert(fields::REVIEW_DATE.into(), now.clone().into());
        patch.insert(fields::UPDATED_AT.into(), now.into());
        self.store.set_merge(FUNDING_COLLECTION, id, patch).await?;

        tracing::info!(
            %id,
            reviewer = %reviewer.identity,
            from = %current.status,
            to = %review.status,
            "funding application reviewed"
        );
        self.get(id)
            .await?
            .ok_or_else(|| AccountError::ApplicationNotFound(id.to_string()))
    }
}
