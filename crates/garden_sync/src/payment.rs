//! Payment confirmation seam used by capacity purchases.

use std::future::Future;

use garden_core::GardenId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub success: bool,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn confirm_purchase(
        &self,
        garden_id: &GardenId,
        count: u32,
        amount_cents: u64,
    ) -> impl Future<Output = Result<PaymentConfirmation, PaymentError>> + Send;
}

/// Approves or declines every purchase without contacting anyone.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    pub approve: bool,
}

impl SimulatedGateway {
    pub fn approving() -> Self {
        Self { approve: true }
    }

    pub fn declining() -> Self {
        Self { approve: false }
    }
}

impl PaymentGateway for SimulatedGateway {
    async fn confirm_purchase(
        &self,
        garden_id: &GardenId,
        count: u32,
        amount_cents: u64,
    ) -> Result<PaymentConfirmation, PaymentError> {
        if !self.approve {
            tracing::debug!(%garden_id, count, amount_cents, "simulated gateway declined");
            return Ok(PaymentConfirmation {
                success: false,
                transaction_id: None,
            });
        }
        Ok(PaymentConfirmation {
            success: true,
            transaction_id: Some(format!("txn_{}", uuid::Uuid::new_v4().simple())),
        })
    }
}
