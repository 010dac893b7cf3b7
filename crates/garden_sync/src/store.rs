//! The remote space store seam and an in-memory implementation of it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use garden_core::{CareRecord, CareTimestamps, Garden, GardenId, GridSpace, PlaceRecord, Plant, SpaceId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::seed::SeedFile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("garden {0} not found")]
    GardenNotFound(GardenId),
    #[error("space {0} not found")]
    SpaceNotFound(SpaceId),
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Authoritative storage for gardens, plants, and spaces.
///
/// Implementations are shared across the sync worker and request handlers,
/// so every future they return must be `Send`.
pub trait SpaceStore: Send + Sync + 'static {
    fn fetch_garden(
        &self,
        garden_id: &GardenId,
    ) -> impl Future<Output = Result<Garden, SyncError>> + Send;

    fn fetch_plants(
        &self,
        garden_id: &GardenId,
    ) -> impl Future<Output = Result<Vec<Plant>, SyncError>> + Send;

    /// May return fewer spaces than the garden's capacity.
    fn fetch_spaces(
        &self,
        garden_id: &GardenId,
    ) -> impl Future<Output = Result<Vec<GridSpace>, SyncError>> + Send;

    /// Writes occupancy and returns the stored id of the space, which differs
    /// from `record.space_id` when the store had to create the record.
    fn persist_place(
        &self,
        record: &PlaceRecord,
    ) -> impl Future<Output = Result<SpaceId, SyncError>> + Send;

    fn persist_remove(&self, space_id: &SpaceId)
        -> impl Future<Output = Result<(), SyncError>> + Send;

    fn persist_care(&self, record: &CareRecord)
        -> impl Future<Output = Result<(), SyncError>> + Send;

    fn record_purchase(
        &self,
        purchase: &PurchaseRecord,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub garden_id: GardenId,
    pub count: u32,
    /// Extra-space total after the purchase.
    pub purchased_extra_spaces: u32,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Default)]
struct StoreData {
    gardens: HashMap<GardenId, Garden>,
    plants: Vec<Plant>,
    spaces: Vec<GridSpace>,
    purchases: Vec<PurchaseRecord>,
}

/// Process-local store. Latency and failures can be injected to exercise
/// the optimistic paths.
#[derive(Debug)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
    next_space_id: AtomicU64,
    latency_ms: AtomicU64,
    offline: AtomicBool,
    failures_remaining: AtomicU32,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            next_space_id: AtomicU64::new(1),
            latency_ms: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            failures_remaining: AtomicU32::new(0),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedFile) -> Self {
        let next_space_id = seed
            .spaces
            .iter()
            .filter_map(|space| space.id.as_str().strip_prefix("space_")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let gardens = seed
            .gardens
            .into_iter()
            .map(|garden| (garden.id.clone(), garden))
            .collect();
        Self {
            data: Mutex::new(StoreData {
                gardens,
                plants: seed.plants,
                spaces: seed.spaces,
                purchases: Vec::new(),
            }),
            next_space_id: AtomicU64::new(next_space_id),
            ..Self::default()
        }
    }

    pub fn insert_garden(&self, garden: Garden) {
        self.data.lock().gardens.insert(garden.id.clone(), garden);
    }

    pub fn insert_plant(&self, plant: Plant) {
        self.data.lock().plants.push(plant);
    }

    pub fn insert_space(&self, space: GridSpace) {
        self.data.lock().spaces.push(space);
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::Relaxed);
    }

    /// While offline every call fails with [`SyncError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Fails the next `count` calls.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::Relaxed);
    }

    pub fn spaces(&self, garden_id: &GardenId) -> Vec<GridSpace> {
        self.data
            .lock()
            .spaces
            .iter()
            .filter(|space| &space.garden_id == garden_id)
            .cloned()
            .collect()
    }

    pub fn purchases(&self) -> Vec<PurchaseRecord> {
        self.data.lock().purchases.clone()
    }

    async fn enter(&self) -> Result<(), SyncError> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::Relaxed) {
            return Err(SyncError::Unavailable("store is offline".to_string()));
        }
        let injected = self
            .failures_remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(SyncError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn issue_space_id(&self) -> SpaceId {
        let n = self.next_space_id.fetch_add(1, Ordering::Relaxed);
        SpaceId(format!("space_{n:06}"))
    }
}

impl SpaceStore for InMemoryStore {
    async fn fetch_garden(&self, garden_id: &GardenId) -> Result<Garden, SyncError> {
        self.enter().await?;
        self.data
            .lock()
            .gardens
            .get(garden_id)
            .cloned()
            .ok_or_else(|| SyncError::GardenNotFound(garden_id.clone()))
    }

    async fn fetch_plants(&self, garden_id: &GardenId) -> Result<Vec<Plant>, SyncError> {
        self.enter().await?;
        Ok(self
            .data
            .lock()
            .plants
            .iter()
            .filter(|plant| &plant.garden_id == garden_id)
            .cloned()
            .collect())
    }

    async fn fetch_spaces(&self, garden_id: &GardenId) -> Result<Vec<GridSpace>, SyncError> {
        self.enter().await?;
        Ok(self.spaces(garden_id))
    }

    async fn persist_place(&self, record: &PlaceRecord) -> Result<SpaceId, SyncError> {
        self.enter().await?;
        let mut data = self.data.lock();
        if !data.gardens.contains_key(&record.garden_id) {
            return Err(SyncError::GardenNotFound(record.garden_id.clone()));
        }

        let existing = if record.persisted {
            let found = data.spaces.iter().position(|s| s.id == record.space_id);
            Some(found.ok_or_else(|| SyncError::SpaceNotFound(record.space_id.clone()))?)
        } else {
            data.spaces.iter().position(|s| {
                s.garden_id == record.garden_id && s.position == record.position && s.active
            })
        };

        let index = if let Some(i) = existing {
            i
        } else {
            let id = self.issue_space_id();
            data.spaces.push(GridSpace {
                id,
                garden_id: record.garden_id.clone(),
                position: record.position.clone(),
                occupant_id: None,
                planting_date: None,
                care: CareTimestamps::default(),
                notes: None,
                image_ref: None,
                care_suggestions: None,
                active: true,
            });
            data.spaces.len() - 1
        };

        let space = &mut data.spaces[index];
        if space
            .occupant_id
            .as_ref()
            .is_some_and(|occupant| occupant != &record.plant_id)
        {
            // Last local write wins.
            space.vacate();
        }
        space.occupant_id = Some(record.plant_id.clone());
        space.planting_date = record.planting_date;
        space.notes.clone_from(&record.notes);
        Ok(space.id.clone())
    }

    async fn persist_remove(&self, space_id: &SpaceId) -> Result<(), SyncError> {
        self.enter().await?;
        let mut data = self.data.lock();
        let space = data
            .spaces
            .iter_mut()
            .find(|s| &s.id == space_id)
            .ok_or_else(|| SyncError::SpaceNotFound(space_id.clone()))?;
        space.vacate();
        Ok(())
    }

    async fn persist_care(&self, record: &CareRecord) -> Result<(), SyncError> {
        self.enter().await?;
        let mut data = self.data.lock();
        let space = data
            .spaces
            .iter_mut()
            .find(|s| s.id == record.space_id)
            .ok_or_else(|| SyncError::SpaceNotFound(record.space_id.clone()))?;
        if space.occupant_id.is_none() {
            return Err(SyncError::Rejected(format!(
                "space {} has no occupant",
                record.space_id
            )));
        }
        space.care = record.care.clone();
        space.image_ref.clone_from(&record.image_ref);
        space.care_suggestions.clone_from(&record.care_suggestions);
        Ok(())
    }

    async fn record_purchase(&self, purchase: &PurchaseRecord) -> Result<(), SyncError> {
        self.enter().await?;
        let mut data = self.data.lock();
        let garden = data
            .gardens
            .get_mut(&purchase.garden_id)
            .ok_or_else(|| SyncError::GardenNotFound(purchase.garden_id.clone()))?;
        garden.purchased_extra_spaces = garden
            .purchased_extra_spaces
            .max(purchase.purchased_extra_spaces);
        data.purchases.push(purchase.clone());
        Ok(())
    }
}
