use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyAdherence {
    /// Chart label, e.g. `Mar 4`.
    pub date: String,
    pub full_date: NaiveDate,
    pub expected: usize,
    pub actual: usize,
    pub adherence_rate: u32,
    pub log_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    /// `Mar 4 - Mar 10`
    pub period: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub logs: usize,
    pub expected: usize,
    pub adherence_rate: u32,
    pub unique_days: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `Mar 2024`
    pub month: String,
    pub logs: usize,
    pub expected: usize,
    pub adherence_rate: u32,
    pub days_with_logs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationAdherence {
    pub medication_id: i64,
    pub name: String,
    pub dosage: Option<String>,
    pub logs: usize,
    pub adherence_rate: u32,
    pub last_taken: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceReport {
    pub today: NaiveDate,
    pub streak: u32,
    /// Overall rate across every medication for the trailing medication window.
    pub adherence_rate: u32,
    pub daily: Vec<DailyAdherence>,
    pub weekly: WeeklySummary,
    pub monthly: Vec<MonthlyTrend>,
    pub medications: Vec<MedicationAdherence>,
}
