//! # narra-library
//!
//! The library projection: converts session documents into per-book
//! entries and aggregate statistics, with a short-TTL in-memory cache
//! and a backfill pass that persists recomputed pages and costs.

pub mod advanced;
pub mod backfill;
pub mod cache;
pub mod entry;
pub mod pdfs;
pub mod stats;

use narra_core::config::NarraConfig;
use narra_core::errors::NarraResult;
use narra_core::models::library::{AdvancedStats, LibraryEntry, LibraryStats};
use narra_core::models::session::SessionStatus;
use narra_store::{Projection, SessionFilters, SessionStore};

pub use backfill::BackfillReport;
use cache::{CachedView, ViewCache};

pub struct LibraryProjector {
    sessions: SessionStore,
    config: NarraConfig,
    cache: ViewCache,
}

impl LibraryProjector {
    pub fn new(sessions: SessionStore, config: NarraConfig) -> Self {
        Self {
            sessions,
            config,
            cache: ViewCache::new(),
        }
    }

    /// Library entries for an owner (or everything when `None`),
    /// newest-first. Served from the 30-second cache when warm. Complete
    /// books missing their precomputed page count get it computed from a
    /// full document load; [`Self::backfill`] persists those values.
    pub fn list(&self, owner: Option<&str>) -> NarraResult<Vec<LibraryEntry>> {
        let key = view_key("library", owner);
        if let Some(CachedView::Entries(entries)) = self.cache.get(&key) {
            return Ok(entries);
        }

        let entries = self.build_entries(owner)?;
        self.cache.put(&key, CachedView::Entries(entries.clone()));
        Ok(entries)
    }

    /// Aggregate statistics over the owner's library.
    pub fn stats(&self, owner: Option<&str>) -> NarraResult<LibraryStats> {
        let key = view_key("stats", owner);
        if let Some(CachedView::Stats(stats)) = self.cache.get(&key) {
            return Ok(stats);
        }
        let entries = self.build_entries(owner)?;
        let stats = stats::calculate_library_stats(&entries);
        self.cache.put(&key, CachedView::Stats(stats.clone()));
        Ok(stats)
    }

    /// Temporal trends and the per-mode comparison table.
    pub fn advanced_stats(&self, owner: Option<&str>) -> NarraResult<AdvancedStats> {
        let key = view_key("advanced", owner);
        if let Some(CachedView::Advanced(stats)) = self.cache.get(&key) {
            return Ok(stats);
        }
        let entries = self.build_entries(owner)?;
        let stats = advanced::calculate_advanced_stats(&entries);
        self.cache.put(&key, CachedView::Advanced(stats.clone()));
        Ok(stats)
    }

    /// Persists recomputed pages/costs for complete sessions that are
    /// missing them, then invalidates the cache.
    pub fn backfill(&self, owner: Option<&str>) -> NarraResult<BackfillReport> {
        let report = backfill::backfill_missing(&self.sessions, &self.config, owner)?;
        if report.pages_written > 0 || report.costs_written > 0 {
            self.cache.invalidate_all();
        }
        Ok(report)
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    fn build_entries(&self, owner: Option<&str>) -> NarraResult<Vec<LibraryEntry>> {
        let filters = SessionFilters {
            owner: owner.map(str::to_string),
            ..Default::default()
        };
        let sessions = self.sessions.list(&filters, Projection::Light)?;

        let mut entries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let mut entry = entry::session_to_entry(&session, &self.config);

            // The light projection elides chapters, so a missing page
            // count needs the full document.
            if entry.total_pages.is_none() && entry.status == SessionStatus::Complete {
                if let Some(full) = self.sessions.load(&session.session_id)? {
                    if !full.book_chapters.is_empty() {
                        entry.total_pages = Some(narra_engine::progress::total_pages(
                            &full,
                            &self.config.validation,
                        ));
                        if entry.completed_chapters == 0 {
                            entry.completed_chapters = full.book_chapters.len() as u32;
                        }
                    }
                }
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn view_key(view: &str, owner: Option<&str>) -> String {
    format!("{view}:{}", owner.unwrap_or("*"))
}
