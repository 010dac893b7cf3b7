//! Builds a complete space list from a possibly incomplete one.
//!
//! Output order: base cells row-major, then purchased slots by index, then
//! every carried-over non-canonical space in input order. Reconciling an
//! already reconciled list with the same context returns it unchanged.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::id::placeholder_space_id;
use crate::{GardenId, GridContext, GridSpace, Position, SpaceSlot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Existing spaces emitted at a canonical position.
    pub reused: usize,
    /// Placeholders created for canonical positions nobody held.
    pub synthesized: usize,
    /// Non-canonical spaces appended after the canonical layout.
    pub carried: usize,
    /// Unoccupied entries dropped: displaced by another entry at the same
    /// position, soft-deleted at a canonical position, or placeholders left
    /// outside the layout.
    pub superseded: usize,
    /// Occupied entries kept despite sharing a position with another
    /// occupied entry.
    pub duplicate_occupied: usize,
    /// Entries that belong to a different garden.
    pub foreign: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub spaces: Vec<SpaceSlot>,
    pub report: ReconcileReport,
}

/// Wraps records fetched from the store.
pub fn from_remote(spaces: impl IntoIterator<Item = GridSpace>) -> Vec<SpaceSlot> {
    spaces.into_iter().map(SpaceSlot::Persisted).collect()
}

pub fn placeholder(garden_id: &GardenId, position: Position) -> SpaceSlot {
    SpaceSlot::Placeholder(GridSpace {
        id: placeholder_space_id(garden_id, &position),
        garden_id: garden_id.clone(),
        position,
        occupant_id: None,
        planting_date: None,
        care: crate::CareTimestamps::default(),
        notes: None,
        image_ref: None,
        care_suggestions: None,
        active: true,
    })
}

/// True when every canonical position of `ctx` is present. A fetched list
/// that fails this must go through [`reconcile`] before use.
pub fn is_complete(spaces: &[SpaceSlot], ctx: GridContext) -> bool {
    if spaces.len() < ctx.total_capacity() as usize {
        return false;
    }
    let present: ahash::AHashSet<&Position> = spaces.iter().map(SpaceSlot::position).collect();
    ctx.canonical_positions().all(|p| present.contains(&p))
}

pub fn reconcile(garden_id: &GardenId, ctx: GridContext, existing: Vec<SpaceSlot>) -> Reconciliation {
    let mut report = ReconcileReport::default();

    let mut entries: Vec<Option<SpaceSlot>> = Vec::with_capacity(existing.len());
    for slot in existing {
        if &slot.space().garden_id == garden_id {
            entries.push(Some(slot));
        } else {
            report.foreign += 1;
        }
    }

    let lookup = index_by_position(&mut entries, ctx, &mut report);

    let mut spaces = Vec::with_capacity(ctx.total_capacity() as usize);
    for position in ctx.canonical_positions() {
        let existing = lookup.get(&position).and_then(|&i| entries[i].take());
        if let Some(slot) = existing {
            report.reused += 1;
            spaces.push(slot);
        } else {
            report.synthesized += 1;
            spaces.push(placeholder(garden_id, position));
        }
    }

    for slot in entries.into_iter().flatten() {
        report.carried += 1;
        spaces.push(slot);
    }

    Reconciliation { spaces, report }
}

/// Picks one entry per position and drops the entries it supersedes.
///
/// The first occupied entry wins a position, falling back to the first
/// entry. Losers that are occupied stay in `entries` so they are carried.
fn index_by_position(
    entries: &mut [Option<SpaceSlot>],
    ctx: GridContext,
    report: &mut ReconcileReport,
) -> AHashMap<Position, usize> {
    let mut lookup: AHashMap<Position, usize> = AHashMap::with_capacity(entries.len());

    for i in 0..entries.len() {
        let Some(slot) = entries[i].as_ref() else {
            continue;
        };
        let space = slot.space();
        let occupied = space.is_occupied();

        let canonical = ctx.is_canonical(&space.position);
        let stale_placeholder = !slot.is_persisted() && !canonical;
        if !occupied && (stale_placeholder || (!space.active && canonical)) {
            entries[i] = None;
            report.superseded += 1;
            continue;
        }

        let Some(&winner) = lookup.get(&space.position) else {
            lookup.insert(space.position.clone(), i);
            continue;
        };
        let winner_occupied = entries[winner]
            .as_ref()
            .is_some_and(|w| w.space().is_occupied());

        match (winner_occupied, occupied) {
            (false, true) => {
                let position = space.position.clone();
                entries[winner] = None;
                report.superseded += 1;
                lookup.insert(position, i);
            }
            (true, true) => report.duplicate_occupied += 1,
            (_, false) => {
                entries[i] = None;
                report.superseded += 1;
            }
        }
    }

    lookup
}
