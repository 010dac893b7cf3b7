use ahash::AHashMap;

use crate::{Plant, PlantId, PlantPlacement, SpaceId, SpaceSlot};

/// Read-only view of who sits where, derived from a space list.
///
/// Built fresh from the current list; there is no mutation API. When remote
/// data already violates one-plant-one-space, the first space in list order
/// answers `space_of` and the rest show up in [`OccupancyIndex::conflicts`].
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    plant_to_space: AHashMap<PlantId, SpaceId>,
    space_to_plant: AHashMap<SpaceId, PlantId>,
    conflicts: Vec<(PlantId, SpaceId)>,
}

impl OccupancyIndex {
    pub fn build(spaces: &[SpaceSlot]) -> Self {
        let mut index = Self::default();
        for slot in spaces {
            let space = slot.space();
            let Some(plant_id) = &space.occupant_id else {
                continue;
            };
            index
                .space_to_plant
                .insert(space.id.clone(), plant_id.clone());
            if index.plant_to_space.contains_key(plant_id) {
                index.conflicts.push((plant_id.clone(), space.id.clone()));
            } else {
                index
                    .plant_to_space
                    .insert(plant_id.clone(), space.id.clone());
            }
        }
        index
    }

    pub fn is_placed(&self, plant_id: &PlantId) -> bool {
        self.plant_to_space.contains_key(plant_id)
    }

    pub fn space_of(&self, plant_id: &PlantId) -> Option<&SpaceId> {
        self.plant_to_space.get(plant_id)
    }

    pub fn occupant_of(&self, space_id: &SpaceId) -> Option<&PlantId> {
        self.space_to_plant.get(space_id)
    }

    pub fn occupied_count(&self) -> usize {
        self.space_to_plant.len()
    }

    /// Extra spaces holding a plant that another space already holds.
    pub fn conflicts(&self) -> &[(PlantId, SpaceId)] {
        &self.conflicts
    }

    /// Annotates each plant with its derived placement state.
    pub fn annotate(&self, plants: &[Plant]) -> Vec<PlantPlacement> {
        plants
            .iter()
            .map(|plant| {
                let space_id = self.space_of(&plant.id).cloned();
                PlantPlacement {
                    plant: plant.clone(),
                    placed: space_id.is_some(),
                    space_id,
                }
            })
            .collect()
    }
}
