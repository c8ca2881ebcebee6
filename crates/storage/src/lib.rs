use std::collections::BTreeSet;
use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use uuid::Uuid;

use shared::{
    domain::{
        fold_name, AllocationId, AllocationRecord, EventDate, EventDateStatus, Role, Volunteer,
        VolunteerId,
    },
    protocol::{AllocationWrite, AvailabilityRow},
};

/// Sheets-style persistence for the authoritative store: one table per
/// entity collection, each row carrying a `created_at` stamp.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dates (
                id         TEXT PRIMARY KEY,
                date       TEXT NOT NULL,
                status     TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure dates table exists")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS volunteers (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure volunteers table exists")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS availability (
                volunteer_id   TEXT NOT NULL,
                volunteer_name TEXT NOT NULL,
                date           TEXT NOT NULL,
                created_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (volunteer_id, date)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure availability table exists")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS allocations (
                id         TEXT PRIMARY KEY,
                date       TEXT NOT NULL,
                function   TEXT NOT NULL,
                person     TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure allocations table exists")?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Dates sheet.
    // ------------------------------------------------------------------

    pub async fn list_dates(&self) -> Result<Vec<EventDate>> {
        let rows = sqlx::query("SELECT id, date, status FROM dates ORDER BY date")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(EventDate {
                    id: row.try_get("id")?,
                    date: row.try_get("date")?,
                    status: parse_status(&row.try_get::<String, _>("status")?)?,
                })
            })
            .collect()
    }

    /// Replaces the dates sheet. A single-date swap (one id removed, one
    /// added) is treated as a rename and cascades into the availability and
    /// allocations sheets, mirroring the client-side rewrite.
    pub async fn replace_dates(&self, dates: &[EventDate]) -> Result<()> {
        let existing = self.list_dates().await?;
        let old_ids: BTreeSet<NaiveDate> = existing.iter().map(|entry| entry.id).collect();
        let new_ids: BTreeSet<NaiveDate> = dates.iter().map(|entry| entry.id).collect();
        let removed: Vec<NaiveDate> = old_ids.difference(&new_ids).copied().collect();
        let added: Vec<NaiveDate> = new_ids.difference(&old_ids).copied().collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dates").execute(&mut *tx).await?;
        for entry in dates {
            sqlx::query("INSERT INTO dates (id, date, status, created_at) VALUES (?, ?, ?, ?)")
                .bind(entry.id)
                .bind(entry.date)
                .bind(status_text(entry.status))
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }

        if let ([old], [new]) = (removed.as_slice(), added.as_slice()) {
            sqlx::query("UPDATE availability SET date = ? WHERE date = ?")
                .bind(*new)
                .bind(*old)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE allocations SET date = ? WHERE date = ?")
                .bind(*new)
                .bind(*old)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Server side of the rotation: drop the completed date, append the next
    /// one past the remaining maximum, and cascade row deletions. Repeating
    /// the call for an already-completed date only re-runs the cascade.
    pub async fn complete_event(
        &self,
        date_id: NaiveDate,
        completed_date: NaiveDate,
        interval_days: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM dates WHERE id = ?")
            .bind(date_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted > 0 {
            let last: Option<NaiveDate> = sqlx::query_scalar("SELECT MAX(date) FROM dates")
                .fetch_one(&mut *tx)
                .await?;
            let next = last.unwrap_or(completed_date) + Duration::days(interval_days);
            sqlx::query("INSERT INTO dates (id, date, status, created_at) VALUES (?, ?, ?, ?)")
                .bind(next)
                .bind(next)
                .bind(status_text(EventDateStatus::Active))
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM availability WHERE date = ?")
            .bind(completed_date)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM allocations WHERE date = ?")
            .bind(completed_date)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Volunteers sheet.
    // ------------------------------------------------------------------

    pub async fn list_volunteers(&self) -> Result<Vec<Volunteer>> {
        let rows = sqlx::query("SELECT id, name FROM volunteers ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Volunteer {
                    id: parse_volunteer_id(&row.try_get::<String, _>("id")?)?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    pub async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<()> {
        sqlx::query("INSERT INTO volunteers (id, name, created_at) VALUES (?, ?, ?)")
            .bind(volunteer.id.0.to_string())
            .bind(&volunteer.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn replace_volunteers(&self, volunteers: &[Volunteer]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM volunteers")
            .execute(&mut *tx)
            .await?;
        for volunteer in volunteers {
            sqlx::query("INSERT INTO volunteers (id, name, created_at) VALUES (?, ?, ?)")
                .bind(volunteer.id.0.to_string())
                .bind(&volunteer.name)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Case-insensitive roster lookup.
    async fn find_volunteer(&self, name: &str) -> Result<Option<Volunteer>> {
        let folded = fold_name(name);
        Ok(self
            .list_volunteers()
            .await?
            .into_iter()
            .find(|volunteer| fold_name(&volunteer.name) == folded))
    }

    // ------------------------------------------------------------------
    // Availability sheet (one row per volunteer x date).
    // ------------------------------------------------------------------

    pub async fn list_availability_rows(&self) -> Result<Vec<AvailabilityRow>> {
        let rows = sqlx::query(
            "SELECT volunteer_id, volunteer_name, date FROM availability ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(AvailabilityRow {
                    volunteer_id: parse_volunteer_id(&row.try_get::<String, _>("volunteer_id")?)?,
                    volunteer_name: row.try_get("volunteer_name")?,
                    date: row.try_get("date")?,
                })
            })
            .collect()
    }

    /// Replaces one volunteer's rows with a fresh set. An unknown volunteer
    /// is added to the roster first.
    pub async fn set_volunteer_availability(
        &self,
        volunteer_name: &str,
        dates: &[NaiveDate],
    ) -> Result<()> {
        let volunteer = match self.find_volunteer(volunteer_name).await? {
            Some(volunteer) => volunteer,
            None => {
                let volunteer = Volunteer {
                    id: VolunteerId::fresh(),
                    name: volunteer_name.trim().to_string(),
                };
                self.insert_volunteer(&volunteer).await?;
                volunteer
            }
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM availability WHERE volunteer_id = ?")
            .bind(volunteer.id.0.to_string())
            .execute(&mut *tx)
            .await?;
        for date in dates {
            sqlx::query(
                "INSERT INTO availability (volunteer_id, volunteer_name, date, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(volunteer.id.0.to_string())
            .bind(&volunteer.name)
            .bind(date)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Drops one volunteer x date row. Unknown volunteers are a no-op.
    pub async fn remove_availability_date(
        &self,
        volunteer_name: &str,
        date: NaiveDate,
    ) -> Result<()> {
        let Some(volunteer) = self.find_volunteer(volunteer_name).await? else {
            return Ok(());
        };
        sqlx::query("DELETE FROM availability WHERE volunteer_id = ? AND date = ?")
            .bind(volunteer.id.0.to_string())
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Allocations sheet.
    // ------------------------------------------------------------------

    pub async fn list_allocations(&self) -> Result<Vec<AllocationRecord>> {
        let rows = sqlx::query("SELECT id, date, function, person FROM allocations ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(AllocationRecord {
                    id: parse_allocation_id(&row.try_get::<String, _>("id")?)?,
                    date: row.try_get("date")?,
                    role: row.try_get::<String, _>("function")?.parse::<Role>()?,
                    person: row.try_get("person")?,
                })
            })
            .collect()
    }

    pub async fn insert_allocation(&self, write: &AllocationWrite) -> Result<AllocationRecord> {
        let record = AllocationRecord {
            id: AllocationId::fresh(),
            date: write.date,
            role: write.role,
            person: write.person.clone(),
        };
        sqlx::query(
            "INSERT INTO allocations (id, date, function, person, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id.0.to_string())
        .bind(record.date)
        .bind(record.role.label())
        .bind(&record.person)
        .bind(write.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    /// Removes every row matching (date, function, person); repeat calls are
    /// no-ops.
    pub async fn delete_allocation(&self, write: &AllocationWrite) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM allocations WHERE date = ? AND function = ? AND person = ?",
        )
        .bind(write.date)
        .bind(write.role.label())
        .bind(&write.person)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn status_text(status: EventDateStatus) -> &'static str {
    match status {
        EventDateStatus::Active => "active",
        EventDateStatus::Completed => "completed",
    }
}

fn parse_status(text: &str) -> Result<EventDateStatus> {
    match text {
        "active" => Ok(EventDateStatus::Active),
        "completed" => Ok(EventDateStatus::Completed),
        other => anyhow::bail!("unknown event date status '{other}'"),
    }
}

fn parse_volunteer_id(text: &str) -> Result<VolunteerId> {
    let raw = Uuid::parse_str(text).with_context(|| format!("invalid volunteer id '{text}'"))?;
    Ok(VolunteerId(raw))
}

fn parse_allocation_id(text: &str) -> Result<AllocationId> {
    let raw = Uuid::parse_str(text).with_context(|| format!("invalid allocation id '{text}'"))?;
    Ok(AllocationId(raw))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return Ok(());
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directory '{}' for database url '{database_url}'",
                    parent.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
