use log::debug;

use crate::db::store::GamificationStore;
use crate::error::StoreError;
use crate::models::{StatePatch, UserGamificationState};

/// A mutation that has been applied to local state but not yet accepted by
/// the store. `tentative` is what the UI may show right away; `patch` is what
/// gets sent. On a failed commit the tentative state must be thrown away and
/// the authoritative state re-read.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub tentative: UserGamificationState,
    pub patch: StatePatch,
}

impl PendingUpdate {
    pub fn new(tentative: UserGamificationState, patch: StatePatch) -> Self {
        Self { tentative, patch }
    }

    /// Nothing changed; committing would be a no-op.
    pub fn unchanged(state: &UserGamificationState) -> Self {
        Self {
            tentative: state.clone(),
            patch: StatePatch::default(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.patch.is_empty()
    }

    /// Send the patch and return the store's merged view of the row.
    pub fn commit<S: GamificationStore + ?Sized>(
        self,
        store: &S,
    ) -> Result<UserGamificationState, StoreError> {
        if self.is_noop() {
            return Ok(self.tentative);
        }
        debug!("committing {:?} for {}", self.patch, self.tentative.user_id);
        store.save_state(&self.tentative.user_id, &self.patch)
    }
}
