//! `garden_sync` — drives a `garden_core` grid against a remote store.
//!
//! Local mutations apply immediately; the remote writes they imply run in
//! order on a background task and never roll local state back.

mod config;
mod controller;
mod outcome;
mod payment;
mod purchase;
mod seed;
mod session;
mod store;

pub use config::{SyncConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_PRICE_PER_SPACE_CENTS};
pub use controller::{ControllerError, PlacementController};
pub use outcome::{SyncAction, SyncOutcome, SyncStatus};
pub use payment::{PaymentConfirmation, PaymentError, PaymentGateway, SimulatedGateway};
pub use purchase::{CapacityPurchaseFlow, PurchaseError, PurchaseReceipt};
pub use seed::{load_seed, validate_seed, SeedFile};
pub use session::GardenSession;
pub use store::{InMemoryStore, PurchaseRecord, SpaceStore, SyncError};
