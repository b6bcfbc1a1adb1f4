use async_trait::async_trait;
use chrono::{DateTime, Utc};
use livery_core::repository::{RosterRepository, UserRepository};
use livery_core::CoreError;
use livery_fleet::{DriverUpdate, RosterEntry, User, UserRole};
use livery_shared::pii::Masked;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

const INSERT_USER: &str = r#"
INSERT INTO users (id, name, email, phone, role, hourly_rate, avatar_url, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
"#;

const SELECT_USER: &str = "SELECT * FROM users WHERE id = $1;";

const SELECT_USER_FOR_UPDATE: &str = "SELECT * FROM users WHERE id = $1 FOR UPDATE;";

const SELECT_USER_BY_EMAIL: &str = "SELECT * FROM users WHERE email = $1;";

const SELECT_USER_BY_PHONE: &str = "SELECT * FROM users WHERE phone = $1;";

const SELECT_ALL_USERS: &str = "SELECT * FROM users ORDER BY created_at ASC;";

const UPDATE_USER: &str = r#"
UPDATE users SET name = $2, email = $3, phone = $4, hourly_rate = $5 WHERE id = $1;
"#;

const INSERT_ROSTER_ENTRY: &str = r#"
INSERT INTO drivers (id, driver_user_id, boss_user_id, created_at)
VALUES ($1, $2, $3, $4);
"#;

const SELECT_ROSTER_FOR_BOSS: &str =
    "SELECT * FROM drivers WHERE boss_user_id = $1 ORDER BY created_at ASC;";

const SELECT_ROSTER_ENTRY: &str =
    "SELECT * FROM drivers WHERE boss_user_id = $1 AND driver_user_id = $2;";

const DELETE_ROSTER_ENTRY: &str = "DELETE FROM drivers WHERE id = $1;";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    role: String,
    hourly_rate: Option<f64>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, livery_fleet::FleetError> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: Masked(self.email),
            phone: Masked(self.phone),
            role: UserRole::from_str(&self.role)?,
            hourly_rate: self.hourly_rate,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(
        &self,
        user: &User,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(INSERT_USER)
            .bind(user.id)
            .bind(&user.name)
            .bind(user.email.inner())
            .bind(user.phone.inner())
            .bind(user.role.as_str())
            .bind(user.hourly_rate)
            .bind(&user.avatar_url)
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, UserRow>(SELECT_USER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRow::into_user).transpose()?)
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, UserRow>(SELECT_USER_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRow::into_user).transpose()?)
    }

    async fn find_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, UserRow>(SELECT_USER_BY_PHONE)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRow::into_user).transpose()?)
    }

    async fn list_users(&self) -> Result<Vec<User>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, UserRow>(SELECT_ALL_USERS)
            .fetch_all(&self.pool)
            .await?;
        let users = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn update_user(
        &self,
        id: Uuid,
        update: &DriverUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(SELECT_USER_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut user = row
            .ok_or_else(|| CoreError::NotFound(format!("user {} not found", id)))?
            .into_user()?;
        update.apply_to(&mut user);

        sqlx::query(UPDATE_USER)
            .bind(id)
            .bind(&user.name)
            .bind(user.email.inner())
            .bind(user.phone.inner())
            .bind(user.hourly_rate)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

pub struct PgRosterRepository {
    pool: PgPool,
}

impl PgRosterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RosterRow {
    id: Uuid,
    driver_user_id: Uuid,
    boss_user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl RosterRow {
    fn into_entry(self) -> RosterEntry {
        RosterEntry {
            id: self.id,
            driver_user_id: self.driver_user_id,
            boss_user_id: self.boss_user_id,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl RosterRepository for PgRosterRepository {
    async fn add_entry(
        &self,
        entry: &RosterEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(INSERT_ROSTER_ENTRY)
            .bind(entry.id)
            .bind(entry.driver_user_id)
            .bind(entry.boss_user_id)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_boss(
        &self,
        boss_user_id: Uuid,
    ) -> Result<Vec<RosterEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, RosterRow>(SELECT_ROSTER_FOR_BOSS)
            .bind(boss_user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RosterRow::into_entry).collect())
    }

    async fn entry_for_driver(
        &self,
        boss_user_id: Uuid,
        driver_user_id: Uuid,
    ) -> Result<Option<RosterEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, RosterRow>(SELECT_ROSTER_ENTRY)
            .bind(boss_user_id)
            .bind(driver_user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RosterRow::into_entry))
    }

    async fn remove_entry(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(DELETE_ROSTER_ENTRY)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
