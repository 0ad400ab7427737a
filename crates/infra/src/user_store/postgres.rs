//! Postgres-backed user store over the `mobile_users` table
//! (`migrations/0001_mobile_users.sql`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` (field from the constraint name) |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / Io / Tls / Timeout | N/A | `Unavailable` |
//! | Row decode failure | N/A | `Unavailable` |
//!
//! `update` runs inside a transaction and locks the row (`SELECT ... FOR UPDATE`)
//! so the read-modify-write of a partial patch is atomic.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use omniven_accounts::{
    ConflictSet, ConflictingField, DeviceId, Email, NewAccount, PhoneNumber, StoredPatch,
    UserAccount, Username,
};
use omniven_auth::{AccountStatus, PasswordDigest};
use omniven_core::{CompanyId, UserId};

use super::{StoreError, UniquenessProbe, UserStore};

const COLUMNS: &str = "user_id, company_id, email, username, password, phone_number, \
                       status, date_c, date_login, date_expiration, notification, device";

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM mobile_users WHERE user_id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, username), err)]
    async fn get_by_username(&self, username: &Username) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM mobile_users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_by_username", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, probe), err)]
    async fn query_conflicts(&self, probe: UniquenessProbe<'_>) -> Result<ConflictSet, StoreError> {
        if probe.is_empty() {
            return Ok(ConflictSet::new());
        }

        // NULL parameters never match, so unprobed fields contribute nothing.
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(BOOL_OR(email = $1), FALSE)        AS email_taken,
                COALESCE(BOOL_OR(username = $2), FALSE)     AS username_taken,
                COALESCE(BOOL_OR(phone_number = $3), FALSE) AS phone_taken
            FROM mobile_users
            WHERE (email = $1 OR username = $2 OR phone_number = $3)
              AND ($4::uuid IS NULL OR user_id <> $4)
            "#,
        )
        .bind(probe.email.map(Email::as_str))
        .bind(probe.username.map(Username::as_str))
        .bind(probe.phone_number.map(PhoneNumber::as_str))
        .bind(probe.exclude.map(|id| *id.as_uuid()))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_conflicts", e))?;

        let mut conflicts = ConflictSet::new();
        for (column, field) in [
            ("email_taken", ConflictingField::Email),
            ("username_taken", ConflictingField::Username),
            ("phone_taken", ConflictingField::PhoneNumber),
        ] {
            let taken: bool = row.try_get(column).map_err(|e| map_sqlx_error("query_conflicts", e))?;
            if taken {
                conflicts.insert(field);
            }
        }
        Ok(conflicts)
    }

    #[instrument(skip(self, record), err)]
    async fn insert(&self, record: NewAccount, created_at: DateTime<Utc>) -> Result<UserAccount, StoreError> {
        let sql = format!(
            "INSERT INTO mobile_users \
                 (company_id, email, username, password, phone_number, status, \
                  date_c, date_expiration, notification, device) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(record.company_id.map(CompanyId::get))
            .bind(record.email.as_str())
            .bind(record.username.as_str())
            .bind(record.password_hash.as_str())
            .bind(record.phone_number.as_str())
            .bind(record.status.get())
            .bind(created_at)
            .bind(record.expires_at)
            .bind(record.notification_pref)
            .bind(record.device_id.as_ref().map(DeviceId::as_str))
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        account_from_row(&row)
    }

    #[instrument(skip(self, patch), fields(user_id = %id), err)]
    async fn update(&self, id: UserId, patch: &StoredPatch) -> Result<Option<UserAccount>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("update", e))?;

        let select = format!("SELECT {COLUMNS} FROM mobile_users WHERE user_id = $1 FOR UPDATE");
        let Some(row) = sqlx::query(&select)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update", e))?
        else {
            return Ok(None);
        };

        let mut account = account_from_row(&row)?;
        account.apply(patch);

        sqlx::query(
            r#"
            UPDATE mobile_users SET
                company_id = $2,
                email = $3,
                username = $4,
                password = $5,
                phone_number = $6,
                status = $7,
                date_login = $8,
                date_expiration = $9,
                notification = $10,
                device = $11
            WHERE user_id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.company_id.map(CompanyId::get))
        .bind(account.email.as_str())
        .bind(account.username.as_str())
        .bind(account.password_hash.as_str())
        .bind(account.phone_number.as_str())
        .bind(account.status.get())
        .bind(account.last_login_at)
        .bind(account.expires_at)
        .bind(account.notification_pref)
        .bind(account.device_id.as_ref().map(DeviceId::as_str))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("update", e))?;
        Ok(Some(account))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM mobile_users WHERE user_id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM mobile_users ORDER BY date_c ASC, user_id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(account_from_row).collect()
    }
}

fn account_from_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    decode_row(row).map_err(|e| StoreError::Unavailable(format!("failed to decode mobile_users row: {e}")))
}

fn decode_row(row: &PgRow) -> Result<UserAccount, sqlx::Error> {
    let company_id: Option<i64> = row.try_get("company_id")?;
    let status: i16 = row.try_get("status")?;
    let device: Option<String> = row.try_get("device")?;

    Ok(UserAccount {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        company_id: company_id
            .map(CompanyId::new)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        email: Email::from_stored(row.try_get::<String, _>("email")?),
        username: Username::from_stored(row.try_get::<String, _>("username")?),
        password_hash: PasswordDigest::from_stored(row.try_get::<String, _>("password")?),
        phone_number: PhoneNumber::from_stored(row.try_get::<String, _>("phone_number")?),
        status: AccountStatus::new(status).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        created_at: row.try_get("date_c")?,
        last_login_at: row.try_get("date_login")?,
        expires_at: row.try_get::<Option<NaiveDate>, _>("date_expiration")?,
        notification_pref: row.try_get("notification")?,
        device_id: device.map(DeviceId::from_stored),
    })
}

/// Map a SQLx error to `StoreError`.
///
/// Only unique violations surface as `Conflict`; everything else means the
/// store could not complete the operation.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let field = db_err.constraint().and_then(field_for_constraint);
                return StoreError::Conflict(field.map(ConflictSet::of).unwrap_or_else(|| {
                    ConflictingField::ALL.into_iter().collect()
                }));
            }
            StoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

fn field_for_constraint(constraint: &str) -> Option<ConflictingField> {
    match constraint {
        "mobile_users_email_key" => Some(ConflictingField::Email),
        "mobile_users_username_key" => Some(ConflictingField::Username),
        "mobile_users_phone_number_key" => Some(ConflictingField::PhoneNumber),
        _ => None,
    }
}
