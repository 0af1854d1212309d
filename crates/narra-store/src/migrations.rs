//! Versioned schema migrations driven by `PRAGMA user_version`.

use rusqlite::Connection;

use narra_core::errors::StoreResult;

use crate::to_store_err;

const SCHEMA_VERSION: i64 = 1;

/// Applies all pending migrations. Idempotent.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let current: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(to_store_err)?;

    if current < 1 {
        apply_v1(conn)?;
    }

    if current < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(to_store_err)?;
        tracing::info!(from = current, to = SCHEMA_VERSION, "applied migrations");
    }
    Ok(())
}

/// v1: sessions (JSON subdocument columns) and users (credit pools).
fn apply_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id          TEXT PRIMARY KEY,
            user_id             TEXT,
            form_data           TEXT NOT NULL,
            question_answers    TEXT NOT NULL DEFAULT '[]',
            generated_questions TEXT,
            draft_history       TEXT NOT NULL DEFAULT '[]',
            current_draft       TEXT,
            current_title       TEXT,
            current_version     INTEGER NOT NULL DEFAULT 0,
            validated           INTEGER NOT NULL DEFAULT 0,
            current_outline     TEXT,
            outline_version     INTEGER NOT NULL DEFAULT 0,
            book_chapters       TEXT NOT NULL DEFAULT '[]',
            writing_progress    TEXT,
            cover_image_path    TEXT,
            literary_critique   TEXT,
            critique_status     TEXT,
            critique_error      TEXT,
            writing_start_time  TEXT,
            writing_end_time    TEXT,
            chapter_start_time  TEXT,
            chapter_timings     TEXT NOT NULL DEFAULT '[]',
            questions_progress  TEXT,
            draft_progress      TEXT,
            outline_progress    TEXT,
            token_usage         TEXT NOT NULL,
            real_cost_eur       REAL,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at);

        CREATE TABLE IF NOT EXISTS users (
            id                    TEXT PRIMARY KEY,
            email                 TEXT NOT NULL UNIQUE,
            password_hash         TEXT NOT NULL,
            name                  TEXT NOT NULL,
            role                  TEXT NOT NULL DEFAULT 'user',
            is_active             INTEGER NOT NULL DEFAULT 1,
            is_verified           INTEGER NOT NULL DEFAULT 0,
            privacy_accepted_at   TEXT,
            marketing_accepted_at TEXT,
            credits_flash         INTEGER NOT NULL DEFAULT 0,
            credits_pro           INTEGER NOT NULL DEFAULT 0,
            credits_ultra         INTEGER NOT NULL DEFAULT 0,
            credits_reset_at      TEXT,
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);",
    )
    .map_err(to_store_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
