//! User store: account creation and lookup, bcrypt password handling.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use narra_core::errors::{StoreError, StoreResult};
use narra_core::models::user::{ModeCredits, User, UserRole};

use crate::pool::StorePool;
use crate::to_store_err;

// bcrypt ignores everything past 72 bytes; clamp explicitly so long
// passphrases hash deterministically across library versions.
const BCRYPT_MAX_BYTES: usize = 72;

#[derive(Clone)]
pub struct UserStore {
    pool: StorePool,
}

impl UserStore {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Creates a user with a freshly hashed password. Fails with
    /// `DuplicateEmail` when the address is taken.
    pub fn create(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: UserRole,
    ) -> StoreResult<User> {
        let email = email.trim().to_lowercase();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            name: name.trim().to_string(),
            role,
            is_active: true,
            is_verified: false,
            privacy_accepted_at: Some(now),
            marketing_accepted_at: None,
            credits: ModeCredits::default(),
            credits_reset_at: None,
            created_at: now,
            updated_at: now,
        };

        self.pool.with_conn(|conn| {
            let exists: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(to_store_err)?;
            if exists.is_some() {
                return Err(StoreError::DuplicateEmail {
                    email: email.clone(),
                });
            }
            insert_user(conn, &user)
        })?;

        Ok(user)
    }

    pub fn get_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        self.pool.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
                |row| Ok(row_to_user(row)),
            )
            .optional()
            .map_err(to_store_err)?
            .transpose()
        })
    }

    pub fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        self.pool.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                |row| Ok(row_to_user(row)),
            )
            .optional()
            .map_err(to_store_err)?
            .transpose()
        })
    }

    /// Checks a password against the stored hash.
    pub fn verify_password(&self, user: &User, password: &str) -> bool {
        let clamped = clamp_password(password);
        bcrypt::verify(clamped, &user.password_hash).unwrap_or(false)
    }

    pub fn set_verified(&self, user_id: &str) -> StoreResult<()> {
        self.pool.with_conn(|conn| {
            let rows = conn
                .execute(
                    "UPDATE users SET is_verified = 1, updated_at = ?1 WHERE id = ?2",
                    params![Utc::now().to_rfc3339(), user_id],
                )
                .map_err(to_store_err)?;
            if rows == 0 {
                return Err(StoreError::UserNotFound {
                    user_id: user_id.to_string(),
                });
            }
            Ok(())
        })
    }
}

fn clamp_password(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(BCRYPT_MAX_BYTES)]
}

fn hash_password(password: &str) -> StoreResult<String> {
    bcrypt::hash(clamp_password(password), bcrypt::DEFAULT_COST).map_err(to_store_err)
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, is_active, is_verified, \
     privacy_accepted_at, marketing_accepted_at, credits_flash, credits_pro, \
     credits_ultra, credits_reset_at, created_at, updated_at";

fn insert_user(conn: &Connection, user: &User) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO users (
            id, email, password_hash, name, role, is_active, is_verified,
            privacy_accepted_at, marketing_accepted_at, credits_flash,
            credits_pro, credits_ultra, credits_reset_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.name,
            role_str(user.role),
            user.is_active as i32,
            user.is_verified as i32,
            user.privacy_accepted_at.map(|t| t.to_rfc3339()),
            user.marketing_accepted_at.map(|t| t.to_rfc3339()),
            user.credits.flash,
            user.credits.pro,
            user.credits.ultra,
            user.credits_reset_at.map(|t| t.to_rfc3339()),
            user.created_at.to_rfc3339(),
            user.updated_at.to_rfc3339(),
        ],
    )
    .map_err(to_store_err)?;
    Ok(())
}

fn row_to_user(row: &Row<'_>) -> StoreResult<User> {
    let parse_dt = |raw: Option<String>| -> StoreResult<Option<DateTime<Utc>>> {
        raw.as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(to_store_err)
            })
            .transpose()
    };

    let role_raw: String = row.get(4).map_err(to_store_err)?;
    Ok(User {
        id: row.get(0).map_err(to_store_err)?,
        email: row.get(1).map_err(to_store_err)?,
        password_hash: row.get(2).map_err(to_store_err)?,
        name: row.get(3).map_err(to_store_err)?,
        role: parse_role(&role_raw),
        is_active: row.get::<_, i32>(5).map_err(to_store_err)? != 0,
        is_verified: row.get::<_, i32>(6).map_err(to_store_err)? != 0,
        privacy_accepted_at: parse_dt(row.get(7).map_err(to_store_err)?)?,
        marketing_accepted_at: parse_dt(row.get(8).map_err(to_store_err)?)?,
        credits: ModeCredits {
            flash: row.get(9).map_err(to_store_err)?,
            pro: row.get(10).map_err(to_store_err)?,
            ultra: row.get(11).map_err(to_store_err)?,
        },
        credits_reset_at: parse_dt(row.get(12).map_err(to_store_err)?)?,
        created_at: parse_dt(row.get(13).map_err(to_store_err)?)?.unwrap_or_else(Utc::now),
        updated_at: parse_dt(row.get(14).map_err(to_store_err)?)?.unwrap_or_else(Utc::now),
    })
}

fn role_str(role: UserRole) -> &'static str {
    match role {
        UserRole::User => "user",
        UserRole::Admin => "admin",
    }
}

fn parse_role(raw: &str) -> UserRole {
    match raw {
        "admin" => UserRole::Admin,
        _ => UserRole::User,
    }
}
