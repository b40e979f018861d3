//! Per-run restore context.

use std::collections::HashSet;

use stowage_proto::payloads::{AccountData, BackupPlan, BackupPurpose};

use crate::records::ServiceId;

/// Working state for one restore run, established by the account frame and
/// discarded when the run ends. Never persisted.
#[derive(Debug)]
pub(crate) struct RestoreContext {
    /// Purpose the stream was exported under.
    pub purpose: BackupPurpose,
    /// Plan level at export time.
    #[allow(dead_code, reason = "Carried for plan-gated restore features")]
    pub plan: BackupPlan,
    /// Era string every placeholder from this run is registered under.
    pub upload_era: String,
    /// Chats applied during this run. Checked before hitting the store so a
    /// restore into an empty store skips dependency lookups for its own
    /// writes.
    known_chats: HashSet<u64>,
    /// Recipients applied during this run.
    known_recipients: HashSet<ServiceId>,
}

impl RestoreContext {
    pub fn from_account(account: &AccountData) -> Self {
        Self {
            purpose: account.purpose,
            plan: account.plan,
            upload_era: account.upload_era.clone(),
            known_chats: HashSet::new(),
            known_recipients: HashSet::new(),
        }
    }

    pub fn note_chat(&mut self, chat_id: u64) {
        self.known_chats.insert(chat_id);
    }

    pub fn knows_chat(&self, chat_id: u64) -> bool {
        self.known_chats.contains(&chat_id)
    }

    pub fn note_recipient(&mut self, id: ServiceId) {
        self.known_recipients.insert(id);
    }

    pub fn knows_recipient(&self, id: &ServiceId) -> bool {
        self.known_recipients.contains(id)
    }
}
