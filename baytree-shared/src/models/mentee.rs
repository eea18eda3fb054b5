/// Mentee model and database operations
///
/// Mentees are the participants imported from the Views directory.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE mentees (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_id VARCHAR(64),
///     first_name VARCHAR(255) NOT NULL DEFAULT '',
///     last_name VARCHAR(255) NOT NULL DEFAULT '',
///     date_of_birth DATE,
///     age INTEGER,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX mentees_external_id_key ON mentees (external_id)
///     WHERE external_id IS NOT NULL;
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const MENTEE_COLUMNS: &str =
    "id, external_id, first_name, last_name, date_of_birth, age, created_at";

/// Mentee model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mentee {
    /// Unique local mentee ID (UUID v4)
    pub id: Uuid,

    /// Views `PersonID`; unique across mentees when present
    pub external_id: Option<String>,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Date of birth as reported by the directory
    pub date_of_birth: Option<NaiveDate>,

    /// Age in whole years, snapshotted when the mentee was imported
    ///
    /// This is NOT kept current. It is computed once by the directory sync
    /// (see [`compute_age`]) and goes stale as time passes; consumers that
    /// need a live age must derive it from `date_of_birth` themselves.
    pub age: Option<i32>,

    /// When the mentee was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new mentee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMentee {
    /// Views `PersonID`
    pub external_id: Option<String>,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Date of birth
    pub date_of_birth: Option<NaiveDate>,

    /// Age snapshot at import time
    pub age: Option<i32>,
}

/// Computes an age snapshot as `floor(days_since(date_of_birth) / 365)`
///
/// Days are counted from midnight UTC on the birth date. Dates in the
/// future yield 0.
pub fn compute_age(date_of_birth: NaiveDate, now: DateTime<Utc>) -> i32 {
    let born = date_of_birth.and_time(chrono::NaiveTime::MIN).and_utc();
    let days = (now - born).num_days().max(0);
    (days / 365) as i32
}

impl Mentee {
    /// Creates a new mentee
    ///
    /// # Errors
    ///
    /// Returns an error if the external ID already exists or the database
    /// connection fails
    pub async fn create(pool: &PgPool, data: CreateMentee) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO mentees (external_id, first_name, last_name, date_of_birth, age)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MENTEE_COLUMNS}"
        );

        sqlx::query_as::<_, Mentee>(&query)
            .bind(data.external_id)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.date_of_birth)
            .bind(data.age)
            .fetch_one(pool)
            .await
    }

    /// Finds a mentee by local ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {MENTEE_COLUMNS} FROM mentees WHERE id = $1");

        sqlx::query_as::<_, Mentee>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a mentee by Views `PersonID`
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {MENTEE_COLUMNS} FROM mentees WHERE external_id = $1");

        sqlx::query_as::<_, Mentee>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Counts total number of mentees
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mentees")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_age_exactly_24_years_of_days() {
        let now = Utc.with_ymd_and_hms(2021, 10, 15, 14, 30, 0).unwrap();
        let dob = (now - Duration::days(24 * 365)).date_naive();
        assert_eq!(compute_age(dob, now), 24);
    }

    #[test]
    fn test_age_one_day_short() {
        let now = Utc.with_ymd_and_hms(2021, 10, 15, 0, 0, 0).unwrap();
        let dob = (now - Duration::days(24 * 365 - 1)).date_naive();
        assert_eq!(compute_age(dob, now), 23);
    }

    #[test]
    fn test_age_ignores_leap_days() {
        // 3653 days / 365 = 10
        let now = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();
        let dob = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        assert_eq!(compute_age(dob, now), 10);

        let dob = NaiveDate::from_ymd_opt(1950, 3, 1).unwrap();
        // 70 years spanning 18 leap days: 25568 days / 365 = 70
        assert_eq!(compute_age(dob, now), 70);
    }

    #[test]
    fn test_age_future_birth_date_is_zero() {
        let now = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let dob = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        assert_eq!(compute_age(dob, now), 0);
    }
}
