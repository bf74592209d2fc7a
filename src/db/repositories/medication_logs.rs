use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{conversion_error, format_datetime, parse_datetime},
    models::{MedicationLog, UserId},
};

// LEFT JOIN keeps logs whose medication has been deleted.
const SELECT_LOG_WITH_MEDICATION: &str =
    "SELECT ml.id, ml.user_id, ml.medication_id, ml.taken_at, ml.notes, ml.synced, ml.created_at,
            m.name AS medication_name, m.dosage AS dosage
     FROM medication_logs ml
     LEFT JOIN medications m ON ml.medication_id = m.id";

fn row_to_log(row: &Row) -> Result<MedicationLog, rusqlite::Error> {
    let taken_at: String = row.get("taken_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(MedicationLog {
        id: row.get("id")?,
        user_id: UserId(row.get("user_id")?),
        medication_id: row.get("medication_id")?,
        taken_at: parse_datetime(&taken_at, "taken_at").map_err(conversion_error)?,
        notes: row.get("notes")?,
        synced: row.get("synced")?,
        created_at: parse_datetime(&created_at, "created_at").map_err(conversion_error)?,
        medication_name: row.get("medication_name")?,
        dosage: row.get("dosage")?,
    })
}

fn select_log(conn: &Connection, log_id: i64) -> Result<Option<MedicationLog>> {
    let sql = format!("{SELECT_LOG_WITH_MEDICATION} WHERE ml.id = ?1");
    let log = conn
        .query_row(&sql, params![log_id], row_to_log)
        .optional()?;
    Ok(log)
}

impl Database {
    /// Records a dose. `None` when the medication does not exist for this user.
    ///
    /// The existence check and the insert run in the same DB task, so a log
    /// always references a medication that existed when it was written.
    pub async fn log_dose(
        &self,
        user: UserId,
        medication_id: i64,
        taken_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Option<MedicationLog>> {
        self.execute(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM medications WHERE id = ?1 AND user_id = ?2",
                    params![medication_id, user.get()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO medication_logs (user_id, medication_id, taken_at, notes, synced, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    user.get(),
                    medication_id,
                    format_datetime(&taken_at),
                    notes,
                    format_datetime(&Utc::now()),
                ],
            )?;

            let log_id = conn.last_insert_rowid();
            select_log(conn, log_id)?
                .map(Some)
                .ok_or_else(|| anyhow!("Medication log not found after insert"))
        })
        .await
    }

    /// Logs of a user, newest first. `limit` of `None` returns everything.
    pub async fn list_logs(&self, user: UserId, limit: Option<u32>) -> Result<Vec<MedicationLog>> {
        self.execute(move |conn| {
            let sql = format!(
                "{SELECT_LOG_WITH_MEDICATION}
                 WHERE ml.user_id = ?1
                 ORDER BY ml.taken_at DESC, ml.id DESC
                 LIMIT ?2"
            );
            // SQLite treats a negative LIMIT as unbounded.
            let limit = limit.map(i64::from).unwrap_or(-1);

            let mut stmt = conn.prepare(&sql)?;
            let logs = stmt
                .query_map(params![user.get(), limit], row_to_log)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(logs)
        })
        .await
    }

    /// Number of logs with `start <= taken_at < end`.
    pub async fn count_logs_between(
        &self,
        user: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        self.execute(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM medication_logs
                 WHERE user_id = ?1 AND taken_at >= ?2 AND taken_at < ?3",
                params![user.get(), format_datetime(&start), format_datetime(&end)],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}
