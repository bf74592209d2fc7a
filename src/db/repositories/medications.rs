use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{conversion_error, format_datetime, parse_datetime},
    models::{Medication, MedicationDraft, UserId},
};

fn row_to_medication(row: &Row) -> Result<Medication, rusqlite::Error> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Medication {
        id: row.get("id")?,
        user_id: UserId(row.get("user_id")?),
        name: row.get("name")?,
        dosage: row.get("dosage")?,
        frequency: row.get("frequency")?,
        notes: row.get("notes")?,
        created_at: parse_datetime(&created_at, "created_at").map_err(conversion_error)?,
        updated_at: parse_datetime(&updated_at, "updated_at").map_err(conversion_error)?,
    })
}

fn select_medication(
    conn: &Connection,
    user: UserId,
    medication_id: i64,
) -> Result<Option<Medication>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, dosage, frequency, notes, created_at, updated_at
         FROM medications
         WHERE id = ?1 AND user_id = ?2",
    )?;
    let medication = stmt
        .query_row(params![medication_id, user.get()], row_to_medication)
        .optional()?;
    Ok(medication)
}

impl Database {
    /// All medications of a user, newest first.
    pub async fn list_medications(&self, user: UserId) -> Result<Vec<Medication>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, dosage, frequency, notes, created_at, updated_at
                 FROM medications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;

            let medications = stmt
                .query_map(params![user.get()], row_to_medication)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(medications)
        })
        .await
    }

    pub async fn create_medication(
        &self,
        user: UserId,
        draft: MedicationDraft,
    ) -> Result<Medication> {
        self.execute(move |conn| {
            let now = format_datetime(&Utc::now());
            conn.execute(
                "INSERT INTO medications (user_id, name, dosage, frequency, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.get(),
                    draft.name,
                    draft.dosage,
                    draft.frequency,
                    draft.notes,
                    now,
                    now,
                ],
            )?;

            let medication_id = conn.last_insert_rowid();
            select_medication(conn, user, medication_id)?
                .ok_or_else(|| anyhow!("Medication not found after insert"))
        })
        .await
    }

    /// Replaces every editable field. `None` when no such medication belongs to the user.
    pub async fn update_medication(
        &self,
        user: UserId,
        medication_id: i64,
        draft: MedicationDraft,
    ) -> Result<Option<Medication>> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE medications
                 SET name = ?1,
                     dosage = ?2,
                     frequency = ?3,
                     notes = ?4,
                     updated_at = ?5
                 WHERE id = ?6 AND user_id = ?7",
                params![
                    draft.name,
                    draft.dosage,
                    draft.frequency,
                    draft.notes,
                    format_datetime(&Utc::now()),
                    medication_id,
                    user.get(),
                ],
            )?;

            if rows_affected == 0 {
                return Ok(None);
            }

            select_medication(conn, user, medication_id)
        })
        .await
    }

    /// Hard delete. Logs pointing at the medication are left in place.
    pub async fn delete_medication(&self, user: UserId, medication_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM medications WHERE id = ?1 AND user_id = ?2",
                params![medication_id, user.get()],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn count_medications(&self, user: UserId) -> Result<i64> {
        self.execute(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM medications WHERE user_id = ?1",
                params![user.get()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}
