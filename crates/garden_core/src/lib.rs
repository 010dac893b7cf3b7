//! `garden_core` — grid space allocation and placement for a garden.
//!
//! No IO, no network, no clock reads. Mutations return the remote writes
//! they imply as [`SyncRequest`]s; performing them is the caller's job.

mod capacity;
mod drag;
mod error;
mod grid;
mod id;
mod occupancy;
mod placement;
pub mod reconcile;
mod types;

pub use capacity::{base_capacity, base_dimensions, checked_total_capacity, total_capacity};
pub use drag::{DragSession, DragTracker};
pub use error::{CapacityError, DragError, PlacementError};
pub use grid::{CapacityExtended, GardenGrid};
pub use id::placeholder_space_id;
pub use occupancy::OccupancyIndex;
pub use placement::{validate_drop, DropRejection, DropVerdict};
pub use reconcile::{reconcile, ReconcileReport, Reconciliation};
pub use types::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
