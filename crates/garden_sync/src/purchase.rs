//! Buying extra grid capacity: payment first, then a local capacity
//! increase reconciled against the current space list.

use std::sync::Arc;

use garden_core::{CapacityError, ReconcileReport, SyncId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::outcome::SyncAction;
use crate::payment::{PaymentError, PaymentGateway};
use crate::session::GardenSession;
use crate::store::{PurchaseRecord, SpaceStore};

/// Returning any of these means the garden's capacity did not change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Gateway(#[from] PaymentError),
    #[error("payment declined")]
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub transaction_id: Option<String>,
    pub count: u32,
    pub amount_cents: u64,
    pub previous_extra_spaces: u32,
    pub purchased_extra_spaces: u32,
    pub total_capacity: u32,
    pub report: ReconcileReport,
    /// The best-effort remote confirmation; its failure does not undo the
    /// local increase.
    pub sync_id: Option<SyncId>,
}

pub struct CapacityPurchaseFlow<S, P> {
    session: GardenSession<S>,
    gateway: Arc<P>,
}

impl<S, P> Clone for CapacityPurchaseFlow<S, P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<S: SpaceStore, P: PaymentGateway> CapacityPurchaseFlow<S, P> {
    pub fn new(session: GardenSession<S>, gateway: Arc<P>) -> Self {
        Self { session, gateway }
    }

    pub fn quote(&self, count: u32) -> Result<u64, CapacityError> {
        if count == 0 {
            return Err(CapacityError::ZeroCount);
        }
        u64::from(count)
            .checked_mul(self.session.config().price_per_space_cents)
            .ok_or(CapacityError::Overflow)
    }

    pub async fn purchase(&self, count: u32) -> Result<PurchaseReceipt, PurchaseError> {
        let amount_cents = self.quote(count)?;
        let garden_id = self.session.garden_id().clone();
        self.session.read(|grid| grid.checked_extension(count))?;

        let confirmation = self
            .gateway
            .confirm_purchase(&garden_id, count, amount_cents)
            .await
            .inspect_err(|err| warn!(%garden_id, count, error = %err, "payment gateway failed"))?;
        if !confirmation.success {
            warn!(%garden_id, count, amount_cents, "payment declined");
            return Err(PurchaseError::Declined);
        }
        let transaction_id = confirmation.transaction_id;

        let (receipt, ids) = self.session.mutate(|grid| {
            let extended = grid.extend_capacity(count)?;
            let record = PurchaseRecord {
                garden_id: garden_id.clone(),
                count,
                purchased_extra_spaces: extended.current,
                transaction_id: transaction_id.clone(),
            };
            let receipt = PurchaseReceipt {
                transaction_id: transaction_id.clone(),
                count,
                amount_cents,
                previous_extra_spaces: extended.previous,
                purchased_extra_spaces: extended.current,
                total_capacity: grid.context().total_capacity(),
                report: extended.report,
                sync_id: None,
            };
            Ok::<_, PurchaseError>((receipt, vec![SyncAction::Purchase { record }]))
        })?;

        info!(
            %garden_id,
            count,
            previous = receipt.previous_extra_spaces,
            current = receipt.purchased_extra_spaces,
            transaction_id = ?receipt.transaction_id,
            "capacity purchased"
        );
        Ok(PurchaseReceipt {
            sync_id: ids.into_iter().next(),
            ..receipt
        })
    }
}
