//! Shared test fixtures for `garden_core` and downstream crates.
//!
//! `basic_garden()` and `premium_garden()` give empty gardens; `plant()` and
//! `stored_space()` build directory and store records by hand.
//! `random_remote_spaces()` produces messy store data for property tests.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    CareTimestamps, Garden, GardenGrid, GardenId, GridSpace, Plant, PlantId, Position, SpaceId,
    Tier,
};

pub const GARDEN: &str = "garden_0001";

pub fn garden_id() -> GardenId {
    GardenId::new(GARDEN)
}

pub fn basic_garden() -> Garden {
    Garden {
        id: garden_id(),
        subscription_tier: Tier::Basic,
        purchased_extra_spaces: 0,
    }
}

pub fn premium_garden() -> Garden {
    Garden {
        id: garden_id(),
        subscription_tier: Tier::Premium,
        purchased_extra_spaces: 0,
    }
}

pub fn plant(id: &str) -> Plant {
    Plant {
        id: PlantId::new(id),
        name: format!("Plant {id}"),
        kind: "vegetable".to_string(),
        garden_id: garden_id(),
        planting_date: NaiveDate::from_ymd_opt(2024, 4, 1),
    }
}

pub fn plants(ids: &[&str]) -> Vec<Plant> {
    ids.iter().map(|id| plant(id)).collect()
}

/// A store record at `position` in the fixture garden.
pub fn stored_space(id: &str, position: &str, occupant: Option<&str>) -> GridSpace {
    GridSpace {
        id: SpaceId::new(id),
        garden_id: garden_id(),
        position: Position::parse(position),
        occupant_id: occupant.map(PlantId::new),
        planting_date: occupant.and(NaiveDate::from_ymd_opt(2024, 4, 2)),
        care: CareTimestamps::default(),
        notes: occupant.map(|_| "from store".to_string()),
        image_ref: None,
        care_suggestions: None,
        active: true,
    }
}

/// Basic garden with plants `plant_a`..`plant_d` and nothing stored yet.
pub fn basic_grid() -> GardenGrid {
    let (grid, _) = GardenGrid::new(
        basic_garden(),
        plants(&["plant_a", "plant_b", "plant_c", "plant_d"]),
        Vec::new(),
    );
    grid
}

/// Basic garden whose cells `1,1` and `1,2` are stored, with `plant_a` in
/// `1,1`.
pub fn stored_grid() -> GardenGrid {
    let (grid, _) = GardenGrid::new(
        basic_garden(),
        plants(&["plant_a", "plant_b", "plant_c", "plant_d"]),
        vec![
            stored_space("space_0001", "1,1", Some("plant_a")),
            stored_space("space_0002", "1,2", None),
        ],
    );
    grid
}

/// Id of the space at `position`.
pub fn space_at(grid: &GardenGrid, position: &str) -> SpaceId {
    let wanted = Position::parse(position);
    grid.spaces()
        .iter()
        .find(|slot| slot.position() == &wanted)
        .map(|slot| slot.id().clone())
        .unwrap_or_else(|| panic!("no space at {position}"))
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Store data with gaps, duplicates, custom and out-of-range positions,
/// soft-deleted rows, and at most one space per plant.
pub fn random_remote_spaces(rng: &mut impl Rng, tier: Tier, purchased_extra: u32) -> Vec<GridSpace> {
    let (rows, cols) = crate::base_dimensions(tier);
    let mut plant_pool: Vec<String> = (1..=12).map(|n| format!("plant_{n:04}")).collect();
    plant_pool.shuffle(rng);

    let count = rng.gen_range(0..=(rows * cols + purchased_extra + 6));
    let mut spaces = Vec::with_capacity(count as usize);
    for n in 0..count {
        let position = match rng.gen_range(0..10) {
            0..=5 => format!("{},{}", rng.gen_range(1..=rows + 1), rng.gen_range(1..=cols)),
            6 | 7 => format!("additional-{}", rng.gen_range(1..=purchased_extra + 2)),
            8 => format!("bed-{}", rng.gen_range(0..3)),
            _ => format!("0{},1", rng.gen_range(1..=rows)),
        };
        let occupant = if rng.gen_bool(0.4) { plant_pool.pop() } else { None };
        let mut space = stored_space(&format!("space_{n:04}"), &position, occupant.as_deref());
        space.active = rng.gen_bool(0.9);
        spaces.push(space);
    }
    spaces
}
