//! The closed category taxonomy
//!
//! Every label assignment in the system references a category defined here.
//! The taxonomy is immutable after construction: adding a category is a
//! configuration change followed by a retrain, never a runtime mutation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Urgency group a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyGroup {
    /// Needs a response or immediate attention
    Action,
    /// Read at leisure, no urgency
    Informational,
    /// Batch-archive or ignore
    Noise,
}

impl UrgencyGroup {
    /// Human-readable heading used in summary views
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Action => "ACTION (needs response)",
            Self::Informational => "INFORMATIONAL (read later)",
            Self::Noise => "NOISE (batch/archive)",
        }
    }
}

/// A single category definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    /// Unique category name
    pub name: String,

    /// Human-readable description, embedded verbatim in the LLM prompt
    pub description: String,

    /// Urgency group for digest views
    pub group: UrgencyGroup,

    /// Global priority rank (0 = most important)
    pub priority: usize,

    /// Whether the category represents mail that needs a user response
    pub actionable: bool,
}

/// The closed, ordered set of valid categories.
///
/// Entries are held in priority order; lookups by name go through an index.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<CategorySpec>,
    by_name: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build a taxonomy from explicit entries, in priority order.
    ///
    /// Rejects duplicate category names.
    pub fn new(mut entries: Vec<CategorySpec>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (rank, entry) in entries.iter_mut().enumerate() {
            entry.priority = rank;
            if by_name.insert(entry.name.clone(), rank).is_some() {
                return Err(Error::config(format!(
                    "duplicate category name '{}' in taxonomy",
                    entry.name
                )));
            }
        }
        Ok(Self { entries, by_name })
    }

    /// The default fifteen-category personal-inbox taxonomy
    pub fn personal_inbox() -> Self {
        let spec = |name: &str, description: &str, group: UrgencyGroup| CategorySpec {
            name: name.to_string(),
            description: description.to_string(),
            group,
            priority: 0, // assigned by `new`
            actionable: group == UrgencyGroup::Action,
        };

        use UrgencyGroup::{Action, Informational, Noise};
        let entries = vec![
            spec(
                "job_interview",
                "Interview scheduling, coding challenges, take-home assignments, offer letters, rejection notices — active hiring process",
                Action,
            ),
            spec(
                "security_auth",
                "Password resets, 2FA codes, login alerts ('new sign-in from...'), breach notifications, account lockout",
                Action,
            ),
            spec(
                "job_opportunity",
                "Recruiter outreach, job recommendations, referral messages, 'we found your profile' emails",
                Action,
            ),
            spec(
                "personal",
                "Direct emails from friends/family, genuine 1:1 personal conversations",
                Action,
            ),
            spec(
                "finance_alert",
                "Bank alerts, fraud warnings, bill due reminders, tax documents, large transaction notices — needs review",
                Action,
            ),
            spec(
                "events_calendar",
                "Event invitations, RSVPs, calendar notifications, meetup/webinar invites",
                Action,
            ),
            spec(
                "job_application_confirm",
                "'We received your application' confirmations, application portal links, status acknowledgments",
                Informational,
            ),
            spec(
                "travel",
                "Flight/hotel bookings, itineraries, boarding passes, check-in reminders, trip notifications",
                Informational,
            ),
            spec(
                "shopping_orders",
                "Order confirmations, shipping/delivery tracking, return/refund confirmations",
                Informational,
            ),
            spec(
                "finance_receipt",
                "Payment receipts, subscription renewals, monthly statements — just records, no action needed",
                Informational,
            ),
            spec(
                "newsletter_content",
                "Substantive content newsletters (Substack, industry blogs, curated digests) the user subscribed to",
                Informational,
            ),
            spec(
                "education",
                "Online course updates (Coursera, Udemy), certifications, learning platform activity, academic communications",
                Informational,
            ),
            spec(
                "social_notification",
                "Social media notifications (LinkedIn, Instagram, Facebook, etc.), likes, comments, connection requests",
                Noise,
            ),
            spec(
                "marketing_promo",
                "Sales announcements, discount codes, product launches, 'we miss you' emails, cold promotional outreach",
                Noise,
            ),
            spec(
                "account_service",
                "Terms of service updates, privacy policy changes, product announcements, generic service emails, anything else",
                Noise,
            ),
        ];

        // Names are distinct by construction
        Self::new(entries).expect("default taxonomy is valid")
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the taxonomy is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is a valid category
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Look up a category by name
    pub fn get(&self, name: &str) -> Option<&CategorySpec> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// All category names, in priority order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// All entries, in priority order
    pub fn iter(&self) -> impl Iterator<Item = &CategorySpec> {
        self.entries.iter()
    }

    /// Entries in one urgency group, in priority order
    pub fn group(&self, group: UrgencyGroup) -> impl Iterator<Item = &CategorySpec> {
        self.entries.iter().filter(move |e| e.group == group)
    }

    /// Validate a candidate category name, returning a validation error
    /// naming the offender when it is unknown.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "category '{name}' is not in the taxonomy"
            )))
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::personal_inbox()
    }
}
