use garden_core::{GardenId, SyncId, SyncRequest};
use serde::{Deserialize, Serialize};

use crate::store::PurchaseRecord;

/// A remote write queued behind a local mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncAction {
    Space { request: SyncRequest },
    Purchase { record: PurchaseRecord },
}

impl SyncAction {
    pub fn label(&self) -> &'static str {
        match self {
            SyncAction::Space { request } => request.label(),
            SyncAction::Purchase { .. } => "purchase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Succeeded,
    /// The local state stands regardless; only a refetch corrects drift.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub id: SyncId,
    pub garden_id: GardenId,
    pub action: SyncAction,
    pub status: SyncStatus,
}

impl SyncOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, SyncStatus::Succeeded)
    }
}
