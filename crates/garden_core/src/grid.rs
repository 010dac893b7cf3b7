use serde::{Deserialize, Serialize};

use crate::reconcile::{from_remote, reconcile, ReconcileReport};
use crate::{
    checked_total_capacity, CapacityError, Garden, GridContext, GridSpace, OccupancyIndex, Plant,
    PlantId, PlantPlacement, SpaceId, SpaceSlot, Tier,
};

/// Local, provisionally authoritative state of one garden: its record, the
/// plant directory snapshot, and the reconciled space list.
///
/// Every mutation runs to completion before returning, so the occupancy and
/// capacity invariants hold whenever the grid is observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenGrid {
    pub(crate) garden: Garden,
    pub(crate) plants: Vec<Plant>,
    pub(crate) spaces: Vec<SpaceSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityExtended {
    pub previous: u32,
    pub current: u32,
    pub report: ReconcileReport,
}

impl GardenGrid {
    /// Builds a grid from fetched records, reconciling them first.
    pub fn new(garden: Garden, plants: Vec<Plant>, remote: Vec<GridSpace>) -> (Self, ReconcileReport) {
        let mut grid = Self {
            garden,
            plants,
            spaces: Vec::new(),
        };
        let report = grid.apply_remote(remote);
        (grid, report)
    }

    pub fn garden(&self) -> &Garden {
        &self.garden
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn spaces(&self) -> &[SpaceSlot] {
        &self.spaces
    }

    pub fn context(&self) -> GridContext {
        self.garden.context()
    }

    pub fn occupancy(&self) -> OccupancyIndex {
        OccupancyIndex::build(&self.spaces)
    }

    pub fn placement_states(&self) -> Vec<PlantPlacement> {
        self.occupancy().annotate(&self.plants)
    }

    pub fn space(&self, space_id: &SpaceId) -> Option<&SpaceSlot> {
        self.spaces.iter().find(|slot| slot.id() == space_id)
    }

    pub fn plant(&self, plant_id: &PlantId) -> Option<&Plant> {
        self.plants.iter().find(|plant| &plant.id == plant_id)
    }

    pub(crate) fn index_of(&self, space_id: &SpaceId) -> Option<usize> {
        self.spaces.iter().position(|slot| slot.id() == space_id)
    }

    /// Replaces local state with a full refetch, reconciled against the
    /// current context.
    pub fn apply_remote(&mut self, remote: Vec<GridSpace>) -> ReconcileReport {
        self.spaces = from_remote(remote);
        self.reconcile_local()
    }

    pub fn replace_plants(&mut self, plants: Vec<Plant>) {
        self.plants = plants;
    }

    /// Re-runs reconciliation over the local list, e.g. after the context
    /// changed.
    pub fn reconcile_local(&mut self) -> ReconcileReport {
        let existing = std::mem::take(&mut self.spaces);
        let result = reconcile(&self.garden.id, self.context(), existing);
        self.spaces = result.spaces;
        result.report
    }

    /// Switches tier. On a downgrade, cells outside the new base grid are
    /// carried as custom positions rather than dropped.
    pub fn set_tier(&mut self, tier: Tier) -> ReconcileReport {
        self.garden.subscription_tier = tier;
        self.reconcile_local()
    }

    /// Grows capacity by `count` purchased slots against the local list, so
    /// occupancy recorded since the last fetch survives.
    pub fn extend_capacity(&mut self, count: u32) -> Result<CapacityExtended, CapacityError> {
        let previous = self.garden.purchased_extra_spaces;
        let current = self.checked_extension(count)?;
        self.garden.purchased_extra_spaces = current;
        let report = self.reconcile_local();
        Ok(CapacityExtended {
            previous,
            current,
            report,
        })
    }

    /// Purchased count after buying `count` more, provided both it and the
    /// total capacity still fit in a `u32`.
    pub fn checked_extension(&self, count: u32) -> Result<u32, CapacityError> {
        if count == 0 {
            return Err(CapacityError::ZeroCount);
        }
        let current = self
            .garden
            .purchased_extra_spaces
            .checked_add(count)
            .ok_or(CapacityError::Overflow)?;
        checked_total_capacity(self.garden.subscription_tier, current)
            .ok_or(CapacityError::Overflow)?;
        Ok(current)
    }

    /// Marks a placeholder as stored under `remote_id`. Returns `false` when
    /// no placeholder with `local_id` remains.
    pub fn promote(&mut self, local_id: &SpaceId, remote_id: SpaceId) -> bool {
        let Some(i) = self
            .spaces
            .iter()
            .position(|slot| !slot.is_persisted() && slot.id() == local_id)
        else {
            return false;
        };
        let mut space = self.spaces[i].clone().into_space();
        space.id = remote_id;
        self.spaces[i] = SpaceSlot::Persisted(space);
        true
    }
}
