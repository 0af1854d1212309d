//! Row ↔ `Session` codec. Subdocuments are JSON columns; timestamps are
//! RFC 3339 text.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use narra_core::errors::{StoreError, StoreResult};
use narra_core::models::session::{CritiqueStatus, Session};
use narra_core::models::tokens::TokenUsage;

use super::Projection;
use crate::to_store_err;

const FULL_COLUMNS: &str = "session_id, user_id, form_data, question_answers, \
     generated_questions, draft_history, current_draft, current_title, \
     current_version, validated, current_outline, outline_version, \
     book_chapters, writing_progress, cover_image_path, literary_critique, \
     critique_status, critique_error, writing_start_time, writing_end_time, \
     chapter_start_time, chapter_timings, questions_progress, draft_progress, \
     outline_progress, token_usage, real_cost_eur, created_at, updated_at";

// Same column order; heavy subdocuments replaced by their defaults. The
// outline text collapses to a presence marker so the derived status
// still distinguishes draft from outline.
const LIGHT_COLUMNS: &str = "session_id, user_id, form_data, question_answers, \
     generated_questions, '[]' AS draft_history, NULL AS current_draft, current_title, \
     current_version, validated, \
     CASE WHEN current_outline IS NULL THEN NULL ELSE '' END AS current_outline, \
     outline_version, \
     '[]' AS book_chapters, writing_progress, cover_image_path, literary_critique, \
     critique_status, critique_error, writing_start_time, writing_end_time, \
     chapter_start_time, chapter_timings, questions_progress, draft_progress, \
     outline_progress, token_usage, real_cost_eur, created_at, updated_at";

fn columns(projection: Projection) -> &'static str {
    match projection {
        Projection::Full => FULL_COLUMNS,
        Projection::Light => LIGHT_COLUMNS,
    }
}

pub(super) fn insert(conn: &Connection, session: &Session) -> StoreResult<()> {
    write_row(conn, session, "INSERT INTO sessions")
}

pub(super) fn save(conn: &Connection, session: &Session) -> StoreResult<()> {
    write_row(conn, session, "INSERT OR REPLACE INTO sessions")
}

fn write_row(conn: &Connection, session: &Session, verb: &str) -> StoreResult<()> {
    let sql = format!(
        "{verb} (
            session_id, user_id, form_data, question_answers,
            generated_questions, draft_history, current_draft, current_title,
            current_version, validated, current_outline, outline_version,
            book_chapters, writing_progress, cover_image_path, literary_critique,
            critique_status, critique_error, writing_start_time, writing_end_time,
            chapter_start_time, chapter_timings, questions_progress, draft_progress,
            outline_progress, token_usage, real_cost_eur, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
        )"
    );

    conn.execute(
        &sql,
        params![
            session.session_id,
            session.user_id,
            to_json(&session.form_data)?,
            to_json(&session.question_answers)?,
            to_opt_json(&session.generated_questions)?,
            to_json(&session.draft_history)?,
            session.current_draft,
            session.current_title,
            session.current_version,
            session.validated as i32,
            session.current_outline,
            session.outline_version,
            to_json(&session.book_chapters)?,
            to_opt_json(&session.writing_progress)?,
            session.cover_image_path,
            to_opt_json(&session.literary_critique)?,
            session.critique_status.map(critique_status_str),
            session.critique_error,
            session.writing_start_time.map(|t| t.to_rfc3339()),
            session.writing_end_time.map(|t| t.to_rfc3339()),
            session.chapter_start_time.map(|t| t.to_rfc3339()),
            to_json(&session.chapter_timings)?,
            to_opt_json(&session.questions_progress)?,
            to_opt_json(&session.draft_progress)?,
            to_opt_json(&session.outline_progress)?,
            to_json(&session.token_usage)?,
            session.real_cost_eur,
            session.created_at.to_rfc3339(),
            session.updated_at.to_rfc3339(),
        ],
    )
    .map_err(to_store_err)?;
    Ok(())
}

pub(super) fn load(
    conn: &Connection,
    session_id: &str,
    projection: Projection,
) -> StoreResult<Option<Session>> {
    let sql = format!(
        "SELECT {} FROM sessions WHERE session_id = ?1",
        columns(projection)
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(to_store_err)?;
    let result = stmt
        .query_row(params![session_id], |row| Ok(row_to_session(row)))
        .optional()
        .map_err(to_store_err)?;
    match result {
        Some(parsed) => Ok(Some(parsed?)),
        None => Ok(None),
    }
}

pub(super) fn list_rows(
    conn: &Connection,
    owner: Option<&str>,
    projection: Projection,
) -> StoreResult<Vec<Session>> {
    let base = format!("SELECT {} FROM sessions", columns(projection));
    let sql = match owner {
        Some(_) => format!("{base} WHERE user_id = ?1 ORDER BY created_at DESC"),
        None => format!("{base} ORDER BY created_at DESC"),
    };
    let mut stmt = conn.prepare_cached(&sql).map_err(to_store_err)?;

    let mapped = match owner {
        Some(uid) => stmt
            .query_map(params![uid], |row| Ok(row_to_session(row)))
            .map_err(to_store_err)?
            .collect::<Result<Vec<_>, _>>(),
        None => stmt
            .query_map([], |row| Ok(row_to_session(row)))
            .map_err(to_store_err)?
            .collect::<Result<Vec<_>, _>>(),
    }
    .map_err(to_store_err)?;

    let mut sessions = Vec::with_capacity(mapped.len());
    for parsed in mapped {
        match parsed {
            Ok(session) => sessions.push(session),
            // One corrupt document must not take down the whole listing.
            Err(err) => tracing::warn!(error = %err, "skipping unreadable session row"),
        }
    }
    Ok(sessions)
}

/// Parses a full row (either column set; the light variant substitutes
/// defaults in the same positions) into a `Session`.
fn row_to_session(row: &Row<'_>) -> StoreResult<Session> {
    let session_id: String = get(row, 0)?;

    let corrupt = |message: String| StoreError::CorruptDocument {
        session_id: session_id.clone(),
        message,
    };

    let form_json: String = get(row, 2)?;
    let answers_json: String = get(row, 3)?;
    let questions_json: Option<String> = get(row, 4)?;
    let history_json: String = get(row, 5)?;
    let chapters_json: String = get(row, 12)?;
    let progress_json: Option<String> = get(row, 13)?;
    let critique_json: Option<String> = get(row, 15)?;
    let critique_status_str: Option<String> = get(row, 16)?;
    let timings_json: String = get(row, 21)?;
    let questions_progress_json: Option<String> = get(row, 22)?;
    let draft_progress_json: Option<String> = get(row, 23)?;
    let outline_progress_json: Option<String> = get(row, 24)?;
    let usage_json: String = get(row, 25)?;

    Ok(Session {
        session_id: session_id.clone(),
        user_id: get(row, 1)?,
        form_data: from_json(&form_json).map_err(&corrupt)?,
        question_answers: from_json(&answers_json).map_err(&corrupt)?,
        generated_questions: from_opt_json(questions_json.as_deref()).map_err(&corrupt)?,
        draft_history: from_json(&history_json).map_err(&corrupt)?,
        current_draft: get(row, 6)?,
        current_title: get(row, 7)?,
        current_version: get(row, 8)?,
        validated: get::<i32>(row, 9)? != 0,
        current_outline: get(row, 10)?,
        outline_version: get(row, 11)?,
        book_chapters: from_json(&chapters_json).map_err(&corrupt)?,
        writing_progress: from_opt_json(progress_json.as_deref()).map_err(&corrupt)?,
        cover_image_path: get(row, 14)?,
        literary_critique: from_opt_json(critique_json.as_deref()).map_err(&corrupt)?,
        critique_status: critique_status_str
            .as_deref()
            .map(parse_critique_status)
            .transpose()
            .map_err(&corrupt)?,
        critique_error: get(row, 17)?,
        writing_start_time: parse_opt_dt(get(row, 18)?).map_err(&corrupt)?,
        writing_end_time: parse_opt_dt(get(row, 19)?).map_err(&corrupt)?,
        chapter_start_time: parse_opt_dt(get(row, 20)?).map_err(&corrupt)?,
        chapter_timings: from_json(&timings_json).map_err(&corrupt)?,
        questions_progress: from_opt_json(questions_progress_json.as_deref())
            .map_err(&corrupt)?,
        draft_progress: from_opt_json(draft_progress_json.as_deref()).map_err(&corrupt)?,
        outline_progress: from_opt_json(outline_progress_json.as_deref()).map_err(&corrupt)?,
        token_usage: from_json::<TokenUsage>(&usage_json).map_err(&corrupt)?,
        real_cost_eur: get(row, 26)?,
        created_at: parse_dt(&get::<String>(row, 27)?).map_err(&corrupt)?,
        updated_at: parse_dt(&get::<String>(row, 28)?).map_err(&corrupt)?,
    })
}

fn get<T: rusqlite::types::FromSql>(row: &Row<'_>, idx: usize) -> StoreResult<T> {
    row.get(idx).map_err(to_store_err)
}

fn to_json<T: serde::Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(to_store_err)
}

fn to_opt_json<T: serde::Serialize>(value: &Option<T>) -> StoreResult<Option<String>> {
    value.as_ref().map(to_json).transpose()
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

fn from_opt_json<T: serde::de::DeserializeOwned>(
    raw: Option<&str>,
) -> Result<Option<T>, String> {
    raw.map(from_json).transpose()
}

fn parse_dt(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("parse datetime '{raw}': {e}"))
}

fn parse_opt_dt(raw: Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    raw.as_deref().map(parse_dt).transpose()
}

fn critique_status_str(status: CritiqueStatus) -> &'static str {
    match status {
        CritiqueStatus::Pending => "pending",
        CritiqueStatus::Running => "running",
        CritiqueStatus::Completed => "completed",
        CritiqueStatus::Failed => "failed",
    }
}

fn parse_critique_status(raw: &str) -> Result<CritiqueStatus, String> {
    match raw {
        "pending" => Ok(CritiqueStatus::Pending),
        "running" => Ok(CritiqueStatus::Running),
        "completed" => Ok(CritiqueStatus::Completed),
        "failed" => Ok(CritiqueStatus::Failed),
        other => Err(format!("unknown critique status '{other}'")),
    }
}
