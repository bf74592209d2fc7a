mod adherence;
pub mod handlers;
mod streak;
mod types;

pub use adherence::{
    adherence_rate, daily_adherence, local_day, medication_adherence, monthly_trends,
    percentage, weekly_summary,
};
pub use streak::calculate_streak;
pub use types::{
    AdherenceReport, DailyAdherence, MedicationAdherence, MonthlyTrend, WeeklySummary,
};

use chrono::NaiveDate;

use crate::db::{Medication, MedicationLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub daily_days: u32,
    pub months: u32,
    pub medication_window_days: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            daily_days: 7,
            months: 3,
            medication_window_days: 30,
        }
    }
}

/// Every chart metric for one user as of `today`.
pub fn build_report(
    logs: &[MedicationLog],
    medications: &[Medication],
    today: NaiveDate,
    options: ReportOptions,
) -> AdherenceReport {
    let window_start = adherence::window_start(today, options.medication_window_days);

    AdherenceReport {
        today,
        streak: calculate_streak(logs, today),
        adherence_rate: adherence_rate(logs, medications, window_start, today),
        daily: daily_adherence(logs, medications, today, options.daily_days),
        weekly: weekly_summary(logs, medications, today),
        monthly: monthly_trends(logs, medications, today, options.months),
        medications: medication_adherence(
            logs,
            medications,
            today,
            options.medication_window_days,
        ),
    }
}
