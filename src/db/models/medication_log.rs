//! Dose log data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// One recorded dose, joined with the medication it was logged against.
///
/// `medication_name` and `dosage` come from the medications table and are
/// `None` once that medication has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationLog {
    pub id: i64,
    pub user_id: UserId,
    pub medication_id: i64,
    pub taken_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub synced: bool,
    pub created_at: DateTime<Utc>,
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogDoseInput {
    /// RFC 3339 timestamp; defaults to now.
    pub taken_at: Option<String>,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
}
