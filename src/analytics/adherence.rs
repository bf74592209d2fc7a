use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Days, Duration, Local, Months, NaiveDate, Utc};

use crate::db::{Medication, MedicationLog};

use super::types::{DailyAdherence, MedicationAdherence, MonthlyTrend, WeeklySummary};

/// Local calendar day a dose was taken on.
pub fn local_day(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

/// `round(actual / expected * 100)`, capped at 100; 0 when nothing is expected.
pub fn percentage(actual: usize, expected: usize) -> u32 {
    if expected == 0 {
        return 0;
    }
    let rate = (actual as f64 / expected as f64 * 100.0).round();
    (rate as u32).min(100)
}

fn logs_between<'a>(
    logs: &'a [MedicationLog],
    start: NaiveDate,
    end: NaiveDate,
) -> impl Iterator<Item = &'a MedicationLog> + 'a {
    logs.iter().filter(move |log| {
        let day = local_day(&log.taken_at);
        day >= start && day <= end
    })
}

fn distinct_days<'a>(logs: impl Iterator<Item = &'a MedicationLog>) -> usize {
    logs.map(|log| local_day(&log.taken_at))
        .collect::<BTreeSet<_>>()
        .len()
}

/// First day of a `days`-long window ending today; clamps at the earliest date.
pub(crate) fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days.max(1)) - 1))
        .unwrap_or(NaiveDate::MIN)
}

/// Adherence over the inclusive day range `[start, end]`.
pub fn adherence_rate(
    logs: &[MedicationLog],
    medications: &[Medication],
    start: NaiveDate,
    end: NaiveDate,
) -> u32 {
    if logs.is_empty() || medications.is_empty() || end < start {
        return 0;
    }
    let days = (end - start).num_days() as usize + 1;
    let taken = logs_between(logs, start, end).count();
    percentage(taken, days * medications.len())
}

/// One entry per day for the last `days` days, oldest first.
pub fn daily_adherence(
    logs: &[MedicationLog],
    medications: &[Medication],
    today: NaiveDate,
    days: u32,
) -> Vec<DailyAdherence> {
    let days = days.max(1);
    let expected = medications.len();

    window_start(today, days)
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let log_ids: Vec<i64> = logs
                .iter()
                .filter(|log| local_day(&log.taken_at) == date)
                .map(|log| log.id)
                .collect();

            DailyAdherence {
                date: date.format("%b %-d").to_string(),
                full_date: date,
                expected,
                actual: log_ids.len(),
                adherence_rate: percentage(log_ids.len(), expected),
                log_ids,
            }
        })
        .collect()
}

/// Monday-to-Sunday week containing `today`.
pub fn weekly_summary(
    logs: &[MedicationLog],
    medications: &[Medication],
    today: NaiveDate,
) -> WeeklySummary {
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let week_end = week_start + Duration::days(6);

    let week_logs = logs_between(logs, week_start, week_end).count();
    let expected = medications.len() * 7;

    WeeklySummary {
        period: format!(
            "{} - {}",
            week_start.format("%b %-d"),
            week_end.format("%b %-d")
        ),
        week_start,
        week_end,
        logs: week_logs,
        expected,
        adherence_rate: percentage(week_logs, expected),
        unique_days: distinct_days(logs_between(logs, week_start, week_end)),
    }
}

/// Calendar-month trend for the last `months` months, oldest first.
pub fn monthly_trends(
    logs: &[MedicationLog],
    medications: &[Medication],
    today: NaiveDate,
    months: u32,
) -> Vec<MonthlyTrend> {
    let current_month = today - Duration::days(i64::from(today.day0()));

    (0..months.max(1))
        .rev()
        .filter_map(|offset| {
            let month_start = current_month.checked_sub_months(Months::new(offset))?;
            let month_end = month_start.checked_add_months(Months::new(1))?.pred_opt()?;

            let month_logs = logs_between(logs, month_start, month_end).count();
            let expected = medications.len() * month_end.day() as usize;

            Some(MonthlyTrend {
                month: month_start.format("%b %Y").to_string(),
                logs: month_logs,
                expected,
                adherence_rate: percentage(month_logs, expected),
                days_with_logs: distinct_days(logs_between(logs, month_start, month_end)),
            })
        })
        .collect()
}

/// Per-medication adherence over a trailing window of `days` days.
///
/// Each medication is expected once a day regardless of its free-text frequency.
pub fn medication_adherence(
    logs: &[MedicationLog],
    medications: &[Medication],
    today: NaiveDate,
    days: u32,
) -> Vec<MedicationAdherence> {
    let days = days.max(1);
    let start = window_start(today, days);

    medications
        .iter()
        .map(|medication| {
            let in_window: Vec<&MedicationLog> = logs
                .iter()
                .filter(|log| {
                    log.medication_id == medication.id && local_day(&log.taken_at) >= start
                })
                .collect();

            MedicationAdherence {
                medication_id: medication.id,
                name: medication.name.clone(),
                dosage: medication.dosage.clone(),
                logs: in_window.len(),
                adherence_rate: percentage(in_window.len(), days as usize),
                last_taken: in_window.iter().map(|log| log.taken_at).max(),
            }
        })
        .collect()
}
