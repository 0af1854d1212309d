//! The weekly credit ledger. Pools refill lazily on the first access on
//! or after the Monday-00:00-UTC boundary following the last reset;
//! consumption is a single conditional decrement so concurrent consumers
//! can never drive a pool negative.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rusqlite::params;

use narra_core::config::CreditsConfig;
use narra_core::errors::{NarraError, NarraResult, StoreError};
use narra_core::models::user::{CreditMode, ModeCredits};

use crate::pool::StorePool;
use crate::to_store_err;

#[derive(Clone)]
pub struct CreditLedger {
    pool: StorePool,
    config: CreditsConfig,
}

/// The first Monday 00:00 UTC strictly after `t`.
pub fn next_monday_utc(t: DateTime<Utc>) -> DateTime<Utc> {
    let days_ahead = 7 - i64::from(t.weekday().num_days_from_monday());
    let next = (t + Duration::days(days_ahead)).date_naive();
    Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}

impl CreditLedger {
    pub fn new(pool: StorePool, config: CreditsConfig) -> Self {
        Self { pool, config }
    }

    /// Returns the current pool after a lazy refill, along with the last
    /// reset time and the next reset boundary.
    pub fn get(
        &self,
        user_id: &str,
    ) -> NarraResult<(ModeCredits, DateTime<Utc>, DateTime<Utc>)> {
        let (credits, reset_at) = self.refill_if_due(user_id, Utc::now())?;
        Ok((credits, reset_at, next_monday_utc(reset_at)))
    }

    /// Atomic check-and-decrement of one credit. Fails with
    /// `CreditsExhausted` carrying the mode and the next reset boundary.
    pub fn consume(&self, user_id: &str, mode: CreditMode) -> NarraResult<ModeCredits> {
        let now = Utc::now();
        let (_, reset_at) = self.refill_if_due(user_id, now)?;

        let column = credit_column(mode);
        let updated = self.pool.with_conn(|conn| {
            let sql = format!(
                "UPDATE users SET {column} = {column} - 1, updated_at = ?1 \
                 WHERE id = ?2 AND {column} > 0"
            );
            conn.execute(&sql, params![now.to_rfc3339(), user_id])
                .map_err(to_store_err)
        })?;

        if updated == 0 {
            return Err(NarraError::CreditsExhausted {
                mode,
                next_reset_at: next_monday_utc(reset_at),
            });
        }

        let (credits, _) = self.read_pool(user_id)?;
        tracing::info!(user_id, mode = mode.as_str(), ?credits, "credit consumed");
        Ok(credits)
    }

    /// Refills the pool when the weekly boundary has passed. Monotone in
    /// `credits_reset_at`: the stored timestamp only moves forward.
    fn refill_if_due(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> NarraResult<(ModeCredits, DateTime<Utc>)> {
        let (credits, reset_at) = self.read_pool(user_id)?;

        let due = match reset_at {
            None => true,
            Some(last) => now >= next_monday_utc(last),
        };
        if !due {
            return Ok((credits, reset_at.expect("checked above")));
        }

        let weekly = self.config.weekly_pool();
        self.pool.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET credits_flash = ?1, credits_pro = ?2, \
                 credits_ultra = ?3, credits_reset_at = ?4, updated_at = ?4 \
                 WHERE id = ?5",
                params![
                    weekly.flash,
                    weekly.pro,
                    weekly.ultra,
                    now.to_rfc3339(),
                    user_id
                ],
            )
            .map_err(to_store_err)?;
            Ok(())
        })?;
        tracing::info!(user_id, "weekly credit pool refilled");
        Ok((weekly, now))
    }

    fn read_pool(
        &self,
        user_id: &str,
    ) -> NarraResult<(ModeCredits, Option<DateTime<Utc>>)> {
        let row = self.pool.with_conn(|conn| {
            use rusqlite::OptionalExtension;
            conn.query_row(
                "SELECT credits_flash, credits_pro, credits_ultra, credits_reset_at \
                 FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(to_store_err)
        })?;

        let (flash, pro, ultra, reset_raw) =
            row.ok_or_else(|| StoreError::UserNotFound {
                user_id: user_id.to_string(),
            })?;

        let reset_at = reset_raw
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StoreError::Sqlite {
                        message: format!("parse credits_reset_at '{raw}': {e}"),
                    })
            })
            .transpose()?;

        Ok((ModeCredits { flash, pro, ultra }, reset_at))
    }
}

fn credit_column(mode: CreditMode) -> &'static str {
    match mode {
        CreditMode::Flash => "credits_flash",
        CreditMode::Pro => "credits_pro",
        CreditMode::Ultra => "credits_ultra",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_monday_is_strictly_in_the_future() {
        // 2026-07-27 was a Monday.
        let monday = Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap();
        assert_eq!(
            next_monday_utc(monday),
            Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap()
        );

        let wednesday = Utc.with_ymd_and_hms(2026, 7, 29, 15, 30, 0).unwrap();
        assert_eq!(
            next_monday_utc(wednesday),
            Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap()
        );

        let sunday_late = Utc.with_ymd_and_hms(2026, 8, 2, 23, 59, 59).unwrap();
        assert_eq!(
            next_monday_utc(sunday_late),
            Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap()
        );
    }
}
