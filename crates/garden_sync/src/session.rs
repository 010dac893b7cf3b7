//! One open garden: the local grid plus the ordered queue of remote writes
//! that trails it.
//!
//! Every mutation is applied to the grid and its writes are queued under the
//! same lock, so the worker sees writes in exactly the order the local state
//! changed. Writes are fire-and-forget: a failure is reported as a
//! [`SyncOutcome`] and logged, and the local state is never rolled back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use garden_core::{
    CareRecord, CareTimestamps, GardenGrid, GardenId, PlaceRecord, ReconcileReport, SpaceId,
    SyncId, SyncRequest,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::outcome::{SyncAction, SyncOutcome, SyncStatus};
use crate::store::{SpaceStore, SyncError};

enum Job {
    Sync { id: SyncId, action: SyncAction },
    Flush(oneshot::Sender<()>),
}

struct Shared {
    garden_id: GardenId,
    grid: Mutex<GardenGrid>,
    /// Bumped under the grid lock by every local mutation.
    generation: AtomicU64,
    next_sync: AtomicU64,
    outcomes: broadcast::Sender<SyncOutcome>,
    history: Mutex<VecDeque<SyncOutcome>>,
    config: SyncConfig,
}

pub struct GardenSession<S> {
    shared: Arc<Shared>,
    store: Arc<S>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl<S> Clone for GardenSession<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            store: Arc::clone(&self.store),
            jobs: self.jobs.clone(),
        }
    }
}

impl<S: SpaceStore> GardenSession<S> {
    /// Fetches the garden, reconciles its spaces, and starts the sync worker.
    /// Must be called inside a tokio runtime.
    pub async fn open(store: Arc<S>, garden_id: GardenId, config: SyncConfig) -> Result<Self, SyncError> {
        let (garden, plants, remote) = fetch_all(store.as_ref(), &garden_id).await?;
        let (grid, report) = GardenGrid::new(garden, plants, remote);
        log_report(&garden_id, &report);

        let (outcomes, _) = broadcast::channel(config.outcome_channel_capacity.max(1));
        let shared = Arc::new(Shared {
            garden_id,
            grid: Mutex::new(grid),
            generation: AtomicU64::new(0),
            next_sync: AtomicU64::new(1),
            outcomes,
            history: Mutex::new(VecDeque::new()),
            config,
        });
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::clone(&shared), Arc::clone(&store), rx));
        info!(garden_id = %shared.garden_id, "garden session opened");

        Ok(Self { shared, store, jobs })
    }

    pub fn garden_id(&self) -> &GardenId {
        &self.shared.garden_id
    }

    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn read<T>(&self, f: impl FnOnce(&GardenGrid) -> T) -> T {
        f(&*self.shared.grid.lock())
    }

    pub fn snapshot(&self) -> GardenGrid {
        self.shared.grid.lock().clone()
    }

    /// Mutates the grid without queuing any write.
    pub fn update<T>(&self, f: impl FnOnce(&mut GardenGrid) -> T) -> T {
        let mut grid = self.shared.grid.lock();
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        f(&mut *grid)
    }

    /// Applies a space mutation and queues the writes it returns.
    pub fn apply<E>(
        &self,
        mutation: impl FnOnce(&mut GardenGrid) -> Result<Vec<SyncRequest>, E>,
    ) -> Result<Vec<SyncId>, E> {
        self.mutate::<(), E>(|grid| {
            let requests = mutation(grid)?;
            let actions = requests
                .into_iter()
                .map(|request| SyncAction::Space { request })
                .collect();
            Ok(((), actions))
        })
        .map(|((), ids)| ids)
    }

    /// Runs `mutation` against the grid and queues the actions it returns
    /// before the lock is released. Nothing is queued on error.
    pub fn mutate<T, E>(
        &self,
        mutation: impl FnOnce(&mut GardenGrid) -> Result<(T, Vec<SyncAction>), E>,
    ) -> Result<(T, Vec<SyncId>), E> {
        let mut grid = self.shared.grid.lock();
        let (value, actions) = mutation(&mut *grid)?;
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let ids = actions.into_iter().map(|action| self.enqueue(action)).collect();
        drop(grid);
        Ok((value, ids))
    }

    fn enqueue(&self, action: SyncAction) -> SyncId {
        let id = self.shared.next_id();
        debug!(sync_id = %id, action = action.label(), "queued sync");
        let job = Job::Sync {
            id: id.clone(),
            action,
        };
        if let Err(mpsc::error::SendError(Job::Sync { id, action })) = self.jobs.send(job) {
            self.shared.record(
                id,
                action,
                Err(SyncError::Unavailable("sync worker stopped".to_string())),
            );
        }
        id
    }

    /// Resolves once every write queued before the call has completed.
    pub async fn settle(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Waits for queued writes, then replaces local state with a full
    /// refetch reconciled against the stored capacity.
    ///
    /// A local mutation made while the fetch is in flight would be missing
    /// from the fetched rows, so the refetch is repeated until a fetch
    /// completes with no mutation since its writes were settled.
    pub async fn refresh(&self) -> Result<ReconcileReport, SyncError> {
        loop {
            let seen = self.shared.generation.load(Ordering::Acquire);
            self.settle().await;
            let (garden, plants, remote) =
                fetch_all(self.store.as_ref(), &self.shared.garden_id).await?;
            let replaced = {
                let mut grid = self.shared.grid.lock();
                if self.shared.generation.load(Ordering::Acquire) == seen {
                    let (fresh, report) = GardenGrid::new(garden, plants, remote);
                    *grid = fresh;
                    Some(report)
                } else {
                    None
                }
            };
            match replaced {
                Some(report) => {
                    log_report(&self.shared.garden_id, &report);
                    return Ok(report);
                }
                None => debug!(
                    garden_id = %self.shared.garden_id,
                    "grid changed during refresh, refetching"
                ),
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncOutcome> {
        self.shared.outcomes.subscribe()
    }

    /// Most recent outcomes, oldest first.
    pub fn history(&self) -> Vec<SyncOutcome> {
        self.shared.history.lock().iter().cloned().collect()
    }
}

impl Shared {
    fn next_id(&self) -> SyncId {
        let n = self.next_sync.fetch_add(1, Ordering::Relaxed);
        SyncId(format!("sync_{n:06}"))
    }

    fn record(&self, id: SyncId, action: SyncAction, result: Result<(), SyncError>) {
        let status = match result {
            Ok(()) => {
                debug!(sync_id = %id, action = action.label(), "sync succeeded");
                SyncStatus::Succeeded
            }
            Err(err) => {
                warn!(
                    sync_id = %id,
                    garden_id = %self.garden_id,
                    action = action.label(),
                    error = %err,
                    "sync failed, keeping local state"
                );
                SyncStatus::Failed {
                    error: err.to_string(),
                }
            }
        };
        let outcome = SyncOutcome {
            id,
            garden_id: self.garden_id.clone(),
            action,
            status,
        };
        {
            let mut history = self.history.lock();
            history.push_back(outcome.clone());
            while history.len() > self.config.history_limit {
                history.pop_front();
            }
        }
        // No subscribers is fine.
        let _ = self.outcomes.send(outcome);
    }

    /// Follows up a placeholder write once the store has issued an id.
    ///
    /// The local slot is promoted. If it no longer holds the plant, because
    /// the plant moved or was cleared while the write was in flight, the
    /// stored occupancy is removed again. Care recorded while the space was
    /// still local is written now.
    fn after_placeholder_write(&self, record: &PlaceRecord, remote_id: SpaceId) -> Vec<SyncRequest> {
        let mut grid = self.grid.lock();
        if grid.promote(&record.space_id, remote_id.clone()) {
            debug!(local = %record.space_id, remote = %remote_id, "placeholder promoted");
        }
        let Some(space) = grid.space(&remote_id).map(|slot| slot.space()) else {
            return vec![SyncRequest::Remove { space_id: remote_id }];
        };
        if !space.holds(&record.plant_id) {
            return vec![SyncRequest::Remove { space_id: remote_id }];
        }
        let has_care = space.care != CareTimestamps::default()
            || space.image_ref.is_some()
            || space.care_suggestions.is_some();
        if has_care {
            vec![SyncRequest::Care(CareRecord {
                space_id: remote_id,
                care: space.care.clone(),
                image_ref: space.image_ref.clone(),
                care_suggestions: space.care_suggestions.clone(),
            })]
        } else {
            Vec::new()
        }
    }
}

async fn run_worker<S: SpaceStore>(shared: Arc<Shared>, store: Arc<S>, mut jobs: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = jobs.recv().await {
        let (id, action) = match job {
            Job::Sync { id, action } => (id, action),
            Job::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let result = write(store.as_ref(), &action).await;
        let followups = match (&action, &result) {
            (
                SyncAction::Space {
                    request: SyncRequest::Place(record),
                },
                Ok(Some(remote_id)),
            ) if !record.persisted => shared.after_placeholder_write(record, remote_id.clone()),
            _ => Vec::new(),
        };
        shared.record(id, action, result.map(|_| ()));

        for request in followups {
            let action = SyncAction::Space { request };
            let result = write(store.as_ref(), &action).await;
            shared.record(shared.next_id(), action, result.map(|_| ()));
        }
    }
    debug!(garden_id = %shared.garden_id, "sync worker stopped");
}

/// Performs one write. Returns the stored space id for placements.
async fn write<S: SpaceStore>(store: &S, action: &SyncAction) -> Result<Option<SpaceId>, SyncError> {
    match action {
        SyncAction::Space { request } => match request {
            SyncRequest::Place(record) => store.persist_place(record).await.map(Some),
            SyncRequest::Remove { space_id } => store.persist_remove(space_id).await.map(|()| None),
            SyncRequest::Care(record) => store.persist_care(record).await.map(|()| None),
        },
        SyncAction::Purchase { record } => store.record_purchase(record).await.map(|()| None),
    }
}

async fn fetch_all<S: SpaceStore>(
    store: &S,
    garden_id: &GardenId,
) -> Result<(garden_core::Garden, Vec<garden_core::Plant>, Vec<garden_core::GridSpace>), SyncError> {
    tokio::try_join!(
        store.fetch_garden(garden_id),
        store.fetch_plants(garden_id),
        store.fetch_spaces(garden_id),
    )
}

fn log_report(garden_id: &GardenId, report: &ReconcileReport) {
    if report.synthesized > 0 {
        info!(
            %garden_id,
            synthesized = report.synthesized,
            reused = report.reused,
            "space list incomplete, placeholders synthesized"
        );
    }
    if report.duplicate_occupied > 0 || report.foreign > 0 {
        warn!(
            %garden_id,
            duplicate_occupied = report.duplicate_occupied,
            foreign = report.foreign,
            "store returned conflicting spaces"
        );
    }
    debug!(%garden_id, ?report, "reconciled");
}
