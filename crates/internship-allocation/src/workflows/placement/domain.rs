use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier issued by the external profile store.
    StudentId
);
string_id!(
    /// Catalog identifier; also the final, lexical ranking tiebreak.
    InternshipId
);
string_id!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);
string_id!(OfferId);

/// Work arrangement advertised by an internship or requested by a student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Any,
    Remote,
    Onsite,
    Hybrid,
}

impl Modality {
    pub const fn label(self) -> &'static str {
        match self {
            Modality::Any => "any",
            Modality::Remote => "remote",
            Modality::Onsite => "onsite",
            Modality::Hybrid => "hybrid",
        }
    }
}

/// Inclusive numeric range (stipend, duration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> ValueRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// Dates a student can start and must finish by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residence {
    #[default]
    Urban,
    Rural,
}

/// Preference record supplied by the profile store. Empty sets mean "not stated".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub locations: BTreeSet<String>,
    #[serde(default)]
    pub sectors: BTreeSet<String>,
    #[serde(default)]
    pub modality: Modality,
    #[serde(default)]
    pub stipend: Option<ValueRange<u32>>,
    #[serde(default)]
    pub duration_weeks: Option<ValueRange<u16>>,
    #[serde(default)]
    pub availability: Option<AvailabilityWindow>,
    #[serde(default)]
    pub home_state: Option<String>,
    #[serde(default)]
    pub home_city: Option<String>,
    #[serde(default)]
    pub residence: Residence,
    /// Origin marker for aspirational-district policy.
    #[serde(default)]
    pub aspirational_district: bool,
    #[serde(default)]
    pub willing_to_relocate: bool,
}

/// Read-only student snapshot used for scoring; the core never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Policy markers carried by a catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffirmativeFlags {
    #[serde(default)]
    pub rural_quota: bool,
    #[serde(default)]
    pub aspirational_district: bool,
}

/// Catalog entry. Only `filled` is writable by the core, and only through offer acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Internship {
    pub id: InternshipId,
    pub title: String,
    pub organization: String,
    pub sector: String,
    #[serde(default)]
    pub locations: BTreeSet<String>,
    pub modality: Modality,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    #[serde(default)]
    pub preferred_skills: BTreeSet<String>,
    pub stipend: ValueRange<u32>,
    pub duration_weeks: u16,
    pub capacity: u32,
    #[serde(default)]
    pub filled: u32,
    #[serde(default)]
    pub application_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub affirmative: AffirmativeFlags,
}

impl Internship {
    pub fn has_open_seats(&self) -> bool {
        self.filled < self.capacity
    }

    pub fn remaining_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.filled)
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.application_deadline
            .map(|deadline| deadline < now)
            .unwrap_or(false)
    }

    /// Returns why the record cannot be scored, if anything.
    pub fn defect(&self) -> Option<String> {
        if self.id.as_str().trim().is_empty() {
            return Some("blank internship id".to_string());
        }
        if self.filled > self.capacity {
            return Some(format!(
                "filled {} exceeds capacity {}",
                self.filled, self.capacity
            ));
        }
        if !self.stipend.is_ordered() {
            return Some(format!(
                "stipend range {}..{} is inverted",
                self.stipend.min, self.stipend.max
            ));
        }
        if self
            .required_skills
            .iter()
            .chain(self.preferred_skills.iter())
            .any(|skill| skill.trim().is_empty())
        {
            return Some("blank skill entry".to_string());
        }
        None
    }
}

/// Offer state. Everything except `Offered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Offered,
    Accepted,
    Declined,
    Expired,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OfferStatus::Offered => "offered",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Expired => "expired",
        }
    }
}

/// Time-bounded seat offer attached to one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub application_id: ApplicationId,
    pub internship_id: InternshipId,
    pub status: OfferStatus,
    pub offered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub match_score: f64,
}

impl Offer {
    pub fn is_live(&self) -> bool {
        self.status == OfferStatus::Offered
    }

    /// Pure expiry predicate; true once `now` reaches `expires_at`.
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Moves a lapsed live offer to `Expired`. Returns whether anything changed.
    pub fn expire_if_lapsed(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_live() && self.has_lapsed(now) {
            self.status = OfferStatus::Expired;
            true
        } else {
            false
        }
    }
}

/// Normalised comparison key for skills and locations.
pub(crate) fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

pub(crate) fn folded_set<'a, I>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    values.into_iter().map(|value| fold(value)).collect()
}
