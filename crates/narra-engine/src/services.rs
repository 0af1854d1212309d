//! The dependency container handed to handlers and background tasks.
//! Replaces process-wide singletons: everything a task touches is an
//! explicit collaborator here.

use std::sync::Arc;
use std::time::Duration;

use narra_blob::BlobStore;
use narra_core::config::NarraConfig;
use narra_core::traits::{BookRenderer, Notifier};
use narra_llm::LlmGateway;
use narra_store::{CreditLedger, SessionStore, StorePool, UserStore};

pub struct Services {
    pub config: NarraConfig,
    pub sessions: SessionStore,
    pub users: UserStore,
    pub ledger: CreditLedger,
    pub gateway: LlmGateway,
    pub blob: Arc<dyn BlobStore>,
    pub renderer: Arc<dyn BookRenderer>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    pub fn new(
        config: NarraConfig,
        pool: StorePool,
        gateway: LlmGateway,
        blob: Arc<dyn BlobStore>,
        renderer: Arc<dyn BookRenderer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ledger = CreditLedger::new(pool.clone(), config.credits.clone());
        Self {
            sessions: SessionStore::new(pool.clone()),
            users: UserStore::new(pool),
            ledger,
            gateway,
            blob,
            renderer,
            notifier,
            config,
        }
    }

    pub fn timeout_ms(&self, ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    /// Fire-and-forget notification; failures only reach the log.
    pub fn notify(&self, user_id: Option<&str>, event: narra_core::traits::NotificationEvent) {
        if let Some(uid) = user_id {
            self.notifier.notify(uid, event);
        }
    }
}
