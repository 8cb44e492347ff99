use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::DbError;
use crate::db::models::{JobPosting, NewJob, Profile, ProfileChanges};

pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BLOB PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id BLOB PRIMARY KEY REFERENCES users(id),
            username TEXT,
            full_name TEXT,
            avatar_url TEXT,
            gender TEXT,
            date_of_birth TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id BLOB PRIMARY KEY,
            title TEXT NOT NULL,
            company TEXT NOT NULL,
            location TEXT,
            job_type TEXT,
            salary_range TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            posted_by BLOB NOT NULL REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

const JOB_COLUMNS: &str =
    "id, title, company, location, job_type, salary_range, description, created_at, posted_by";

/// Newest first. `owner` narrows the read to one identity's postings.
pub async fn list_jobs(pool: &SqlitePool, owner: Option<Uuid>) -> Result<Vec<JobPosting>, DbError> {
    let rows = match owner {
        Some(owner) => {
            sqlx::query_as::<_, JobPosting>(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs WHERE posted_by = ? ORDER BY created_at DESC"
            ))
            .bind(owner)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, JobPosting>(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

pub async fn get_job(pool: &SqlitePool, id: Uuid) -> Result<Option<JobPosting>, DbError> {
    let row = sqlx::query_as::<_, JobPosting>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn insert_job(pool: &SqlitePool, job: &NewJob, posted_by: Uuid) -> Result<JobPosting, DbError> {
    let row = sqlx::query_as::<_, JobPosting>(&format!(
        r#"
        INSERT INTO jobs (id, title, company, location, job_type, salary_range, description, created_at, posted_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&job.title)
    .bind(&job.company)
    .bind(&job.location)
    .bind(job.job_type.as_str())
    .bind(&job.salary_range)
    .bind(&job.description)
    .bind(Utc::now())
    .bind(posted_by)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

const PROFILE_COLUMNS: &str =
    "id, username, full_name, avatar_url, gender, date_of_birth, created_at, updated_at";

pub async fn get_profile(pool: &SqlitePool, id: Uuid) -> Result<Option<Profile>, DbError> {
    let row = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Creates the empty profile row that backs a freshly signed-up identity.
pub async fn create_profile(pool: &SqlitePool, id: Uuid) -> Result<(), DbError> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO profiles (id, created_at, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns `None` when no profile row exists for `id`.
pub async fn update_profile(
    pool: &SqlitePool,
    id: Uuid,
    changes: &ProfileChanges,
) -> Result<Option<Profile>, DbError> {
    let row = sqlx::query_as::<_, Profile>(&format!(
        r#"
        UPDATE profiles
        SET username = ?, full_name = ?, gender = ?, date_of_birth = ?, updated_at = ?
        WHERE id = ?
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(&changes.username)
    .bind(&changes.full_name)
    .bind(changes.gender.map(|g| g.as_str()))
    .bind(changes.date_of_birth)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::{Gender, JobType};
    use chrono::NaiveDate;

    pub(crate) async fn memory_pool() -> SqlitePool {
        // one connection: every new `sqlite::memory:` connection is a fresh database
        crate::db::connect("sqlite::memory:", 1).await.unwrap()
    }

    pub(crate) async fn insert_user(pool: &SqlitePool, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, 'x', ?)")
            .bind(id)
            .bind(email)
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
        id
    }

    pub(crate) fn new_job(title: &str, location: &str, job_type: JobType) -> NewJob {
        NewJob {
            title: title.to_string(),
            company: "Acme".to_string(),
            location: location.to_string(),
            job_type,
            salary_range: None,
            description: format!("{title} role"),
        }
    }

    #[tokio::test]
    async fn list_jobs_is_newest_first_and_scoped_by_owner() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let bob = insert_user(&pool, "bob@example.com").await;

        let first = insert_job(&pool, &new_job("First", "Austin", JobType::FullTime), alice)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = insert_job(&pool, &new_job("Second", "Boston", JobType::Contract), bob)
            .await
            .unwrap();

        let all = list_jobs(&pool, None).await.unwrap();
        assert_eq!(all.iter().map(|j| j.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let mine = list_jobs(&pool, Some(alice)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "First");
        assert_eq!(mine[0].job_type.as_deref(), Some("full-time"));
    }

    #[tokio::test]
    async fn get_job_returns_none_for_unknown_id() {
        let pool = memory_pool().await;
        assert!(get_job(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_update_round_trip() {
        let pool = memory_pool().await;
        let id = insert_user(&pool, "carol@example.com").await;
        create_profile(&pool, id).await.unwrap();

        let before = get_profile(&pool, id).await.unwrap().unwrap();
        assert_eq!(before.full_name, None);

        let changes = ProfileChanges {
            username: Some("carol".into()),
            full_name: Some("Carol Danvers".into()),
            gender: Some(Gender::Female),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17),
        };
        let after = update_profile(&pool, id, &changes).await.unwrap().unwrap();
        assert_eq!(after.username.as_deref(), Some("carol"));
        assert_eq!(after.gender.as_deref(), Some("female"));
        assert_eq!(after.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn update_without_profile_row_is_none() {
        let pool = memory_pool().await;
        let result = update_profile(&pool, Uuid::new_v4(), &ProfileChanges::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
