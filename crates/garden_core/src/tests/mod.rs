use super::*;
use crate::test_fixtures::{
    basic_garden, basic_grid, garden_id, plant, plants, premium_garden, space_at, stored_grid,
    stored_space,
};

mod reconcile;

// --- Shared test helpers ------------------------------------------------

fn positions(spaces: &[SpaceSlot]) -> Vec<String> {
    spaces.iter().map(|slot| slot.position().to_string()).collect()
}

fn occupant_at(grid: &GardenGrid, position: &str) -> Option<PlantId> {
    let wanted = Position::parse(position);
    grid.spaces()
        .iter()
        .find(|slot| slot.position() == &wanted)
        .and_then(|slot| slot.space().occupant_id.clone())
}

/// Asserts no two spaces hold the same plant.
fn assert_one_space_per_plant(grid: &GardenGrid) {
    let index = grid.occupancy();
    assert!(
        index.conflicts().is_empty(),
        "plants held by more than one space: {:?}",
        index.conflicts()
    );
}
