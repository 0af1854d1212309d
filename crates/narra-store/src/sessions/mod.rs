//! The session store: CRUD, ownership checks, projection queries and the
//! field-scoped merge-safe mutators.

mod codec;
mod mutators;

use chrono::{DateTime, Utc};
use rusqlite::params;

use narra_core::catalog;
use narra_core::errors::{StoreError, StoreResult};
use narra_core::models::form::{QuestionAnswer, SubmissionForm};
use narra_core::models::session::{Session, SessionStatus};
use narra_core::models::user::CreditMode;

use crate::pool::StorePool;
use crate::to_store_err;

/// Which fields a listing loads. `Light` elides the heavy subdocuments
/// (chapters, outline, draft history) for library-view performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Full,
    Light,
}

/// Filters for [`SessionStore::list`]. `owner = None` lists every
/// session (admin path); status is matched against the derived status.
#[derive(Debug, Clone, Default)]
pub struct SessionFilters {
    pub owner: Option<String>,
    pub status: Option<SessionStatus>,
    pub mode: Option<CreditMode>,
    pub genre: Option<String>,
}

/// Persistent store for the session aggregate.
#[derive(Clone)]
pub struct SessionStore {
    pool: StorePool,
}

impl SessionStore {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Creates and persists a fresh session.
    pub fn create(
        &self,
        session_id: &str,
        form_data: SubmissionForm,
        question_answers: Vec<QuestionAnswer>,
        user_id: Option<String>,
    ) -> StoreResult<Session> {
        let session = Session::new(session_id, form_data, question_answers, user_id);
        self.pool.with_conn(|conn| codec::insert(conn, &session))?;
        Ok(session)
    }

    /// Loads a session without an ownership check. Internal paths
    /// (background tasks) use this; API paths go through [`Self::get`].
    pub fn load(&self, session_id: &str) -> StoreResult<Option<Session>> {
        self.pool
            .with_conn(|conn| codec::load(conn, session_id, Projection::Full))
    }

    /// Loads a session enforcing ownership: a session with an owner is
    /// only visible to that owner; legacy unowned sessions are readable
    /// by anyone.
    pub fn get(&self, session_id: &str, caller: Option<&str>) -> StoreResult<Session> {
        let session = self
            .load(session_id)?
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        if let Some(owner) = &session.user_id {
            if caller != Some(owner.as_str()) {
                return Err(StoreError::Unauthorized {
                    session_id: session_id.to_string(),
                });
            }
        }
        Ok(session)
    }

    /// Whole-document replace; bumps `updated_at`.
    pub fn save(&self, session: &mut Session) -> StoreResult<()> {
        session.touch();
        self.pool.with_conn(|conn| codec::save(conn, session))
    }

    /// Deletes a session. Returns whether a row was removed.
    pub fn delete(&self, session_id: &str) -> StoreResult<bool> {
        self.pool.with_conn(|conn| {
            let rows = conn
                .execute(
                    "DELETE FROM sessions WHERE session_id = ?1",
                    params![session_id],
                )
                .map_err(to_store_err)?;
            Ok(rows > 0)
        })
    }

    /// Lists sessions newest-first, applying the filters. Status, mode and
    /// genre are derived/JSON fields, so they filter after the load.
    pub fn list(
        &self,
        filters: &SessionFilters,
        projection: Projection,
    ) -> StoreResult<Vec<Session>> {
        let mut sessions = self.pool.with_conn(|conn| {
            codec::list_rows(conn, filters.owner.as_deref(), projection)
        })?;

        if let Some(status) = filters.status {
            sessions.retain(|s| s.status() == status);
        }
        if let Some(mode) = filters.mode {
            sessions.retain(|s| catalog::mode_of(&s.form_data.llm_model) == mode);
        }
        if let Some(genre) = &filters.genre {
            sessions.retain(|s| s.form_data.genre.as_deref() == Some(genre.as_str()));
        }
        Ok(sessions)
    }

    /// Load-modify-persist under the store lock. All field-scoped
    /// mutators funnel through here, which is what makes them merge-safe
    /// with respect to each other.
    pub(crate) fn mutate<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.pool.with_conn(|conn| {
            let mut session = codec::load(conn, session_id, Projection::Full)?.ok_or_else(
                || StoreError::SessionNotFound {
                    session_id: session_id.to_string(),
                },
            )?;
            let out = f(&mut session)?;
            session.touch();
            codec::save(conn, &session)?;
            Ok(out)
        })
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc::now()
    }
}
