//! Medication data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// A medication tracked for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a medication.
///
/// A `user_id` in the body overrides the request identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationInput {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
}

/// Validated medication fields ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub notes: Option<String>,
}

impl MedicationInput {
    /// Returns `None` when the name is missing or blank.
    pub fn into_draft(self) -> Option<MedicationDraft> {
        let name = self.name?.trim().to_string();
        if name.is_empty() {
            return None;
        }
        Some(MedicationDraft {
            name,
            dosage: self.dosage,
            frequency: self.frequency,
            notes: self.notes,
        })
    }
}
