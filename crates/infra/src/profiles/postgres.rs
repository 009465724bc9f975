//! Postgres-backed profile lookup.
//!
//! Reads display fields from the `profiles` table keyed by the session
//! user id. Rows with NULL names come back as empty strings. The key column
//! is compared as text, so it may be `uuid` (as in Supabase) or `text`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use storegate_auth::{PrincipalId, Profile, ProfileError, ProfileStore};

const FIND_PROFILE: &str = r#"
    SELECT first_name, last_name, avatar_url
    FROM profiles
    WHERE id::text = $1
"#;

#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool that connects on first use, so startup never waits on the database.
    pub fn connect_lazy(database_url: &str) -> Result<Self, ProfileError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| ProfileError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

fn profile_from_row(row: &PgRow) -> Result<Profile, sqlx::Error> {
    Ok(Profile {
        first_name: row.try_get::<Option<String>, _>("first_name")?.unwrap_or_default(),
        last_name: row.try_get::<Option<String>, _>("last_name")?.unwrap_or_default(),
        avatar_url: row.try_get("avatar_url")?,
    })
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn find_profile(&self, id: &PrincipalId) -> Result<Option<Profile>, ProfileError> {
        let row = sqlx::query(FIND_PROFILE)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ProfileError::Unavailable(e.to_string()))?;

        row.as_ref()
            .map(profile_from_row)
            .transpose()
            .map_err(|e| ProfileError::Unavailable(e.to_string()))
    }
}
