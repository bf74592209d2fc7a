use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::db::MedicationLog;

use super::adherence::local_day;

/// Consecutive calendar days with at least one log.
///
/// Counting starts today when today already has a log, otherwise yesterday,
/// so an evening user who has not logged yet keeps yesterday's streak.
pub fn calculate_streak(logs: &[MedicationLog], today: NaiveDate) -> u32 {
    let logged_days: BTreeSet<NaiveDate> = logs.iter().map(|log| local_day(&log.taken_at)).collect();
    if logged_days.is_empty() {
        return 0;
    }

    let mut cursor = if logged_days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    while let Some(day) = cursor.filter(|day| logged_days.contains(day)) {
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}
