//! JSON seed data for the in-memory store.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use garden_core::{Garden, GridSpace, Plant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFile {
    pub gardens: Vec<Garden>,
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub spaces: Vec<GridSpace>,
}

pub fn load_seed(path: &Path) -> Result<SeedFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;
    validate_seed(&seed)?;
    Ok(seed)
}

/// Checks referential integrity. Duplicate positions and gaps are left for
/// reconciliation to handle.
pub fn validate_seed(seed: &SeedFile) -> Result<()> {
    let mut gardens = HashSet::new();
    for garden in &seed.gardens {
        ensure!(gardens.insert(&garden.id), "duplicate garden id {}", garden.id);
    }

    let mut plants = HashSet::new();
    for plant in &seed.plants {
        ensure!(plants.insert(&plant.id), "duplicate plant id {}", plant.id);
        ensure!(
            gardens.contains(&plant.garden_id),
            "plant {} references unknown garden {}",
            plant.id,
            plant.garden_id
        );
    }

    let mut spaces = HashSet::new();
    for space in &seed.spaces {
        ensure!(spaces.insert(&space.id), "duplicate space id {}", space.id);
        ensure!(
            gardens.contains(&space.garden_id),
            "space {} references unknown garden {}",
            space.id,
            space.garden_id
        );
        if let Some(occupant) = &space.occupant_id {
            ensure!(
                plants.contains(occupant),
                "space {} holds unknown plant {occupant}",
                space.id
            );
        }
    }
    Ok(())
}
