//! Type definitions for `garden_core`.
//!
//! Spaces, plants, gardens, the ID newtypes that link them, and the request
//! types the engine hands to the sync layer.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(GardenId);
string_id!(SpaceId);
string_id!(PlantId);
string_id!(SyncId);

// ---------------------------------------------------------------------------
// Tier and context
// ---------------------------------------------------------------------------

/// Subscription tier. Labels are matched case-insensitively; anything the
/// engine does not recognise deserializes as `Basic`, the smallest grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Tier {
    #[default]
    Basic,
    Premium,
}

impl From<String> for Tier {
    fn from(label: String) -> Self {
        Tier::from_label(&label)
    }
}

impl Tier {
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("premium") {
            Tier::Premium
        } else {
            Tier::Basic
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Premium => "premium",
        }
    }
}

/// Everything capacity depends on, passed explicitly rather than read from
/// session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridContext {
    pub tier: Tier,
    pub purchased_extra: u32,
}

impl GridContext {
    pub fn new(tier: Tier, purchased_extra: u32) -> Self {
        Self {
            tier,
            purchased_extra,
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

const ADDITIONAL_PREFIX: &str = "additional-";

/// Where a space sits. Canonical positions are derivable from the grid
/// context; anything else is carried verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    /// 1-indexed `"row,col"` cell of the base grid.
    Grid { row: u32, col: u32 },
    /// 1-indexed `"additional-N"` purchased slot.
    Additional(u32),
    Custom(String),
}

impl Position {
    pub fn grid(row: u32, col: u32) -> Self {
        Position::Grid { row, col }
    }

    /// Parses a stored position string. Only strings that print back
    /// identically are canonical, so `"01,1"` or `"additional-0"` stay custom.
    pub fn parse(raw: &str) -> Self {
        let parsed = if let Some(index) = raw.strip_prefix(ADDITIONAL_PREFIX) {
            index.parse::<u32>().ok().map(Position::Additional)
        } else if let Some((row, col)) = raw.split_once(',') {
            match (row.parse::<u32>(), col.parse::<u32>()) {
                (Ok(row), Ok(col)) => Some(Position::Grid { row, col }),
                _ => None,
            }
        } else {
            None
        };
        match parsed {
            Some(position) if position.is_well_formed() && position.to_string() == raw => position,
            _ => Position::Custom(raw.to_string()),
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            Position::Grid { row, col } => *row >= 1 && *col >= 1,
            Position::Additional(index) => *index >= 1,
            Position::Custom(_) => true,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Grid { row, col } => write!(f, "{row},{col}"),
            Position::Additional(index) => write!(f, "{ADDITIONAL_PREFIX}{index}"),
            Position::Custom(raw) => f.write_str(raw),
        }
    }
}

impl From<String> for Position {
    fn from(raw: String) -> Self {
        Position::parse(&raw)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.to_string()
    }
}

// ---------------------------------------------------------------------------
// Spaces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareKind {
    Water,
    Fertilize,
    Prune,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareTimestamps {
    pub last_watered: Option<DateTime<Utc>>,
    pub last_fertilized: Option<DateTime<Utc>>,
    pub last_pruned: Option<DateTime<Utc>>,
}

impl CareTimestamps {
    pub fn record(&mut self, kind: CareKind, at: DateTime<Utc>) {
        let slot = match kind {
            CareKind::Water => &mut self.last_watered,
            CareKind::Fertilize => &mut self.last_fertilized,
            CareKind::Prune => &mut self.last_pruned,
        };
        *slot = Some(at);
    }
}

/// One addressable cell of a garden. Occupancy metadata is meaningless while
/// `occupant_id` is `None` and is cleared together with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpace {
    pub id: SpaceId,
    pub garden_id: GardenId,
    pub position: Position,
    pub occupant_id: Option<PlantId>,
    pub planting_date: Option<NaiveDate>,
    #[serde(default)]
    pub care: CareTimestamps,
    pub notes: Option<String>,
    pub image_ref: Option<String>,
    /// Opaque payload from image analysis. Stored, never interpreted.
    pub care_suggestions: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl GridSpace {
    pub fn is_occupied(&self) -> bool {
        self.occupant_id.is_some()
    }

    pub fn holds(&self, plant_id: &PlantId) -> bool {
        self.occupant_id.as_ref() == Some(plant_id)
    }

    /// Nulls the occupant and every piece of metadata tied to it.
    pub fn vacate(&mut self) {
        self.occupant_id = None;
        self.planting_date = None;
        self.care = CareTimestamps::default();
        self.notes = None;
        self.image_ref = None;
        self.care_suggestions = None;
    }
}

/// A space as the engine tracks it: either a record the store has issued,
/// or a local stand-in for a canonical position the store never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "space", rename_all = "snake_case")]
pub enum SpaceSlot {
    Persisted(GridSpace),
    Placeholder(GridSpace),
}

impl SpaceSlot {
    pub fn space(&self) -> &GridSpace {
        match self {
            SpaceSlot::Persisted(space) | SpaceSlot::Placeholder(space) => space,
        }
    }

    pub fn space_mut(&mut self) -> &mut GridSpace {
        match self {
            SpaceSlot::Persisted(space) | SpaceSlot::Placeholder(space) => space,
        }
    }

    pub fn into_space(self) -> GridSpace {
        match self {
            SpaceSlot::Persisted(space) | SpaceSlot::Placeholder(space) => space,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, SpaceSlot::Persisted(_))
    }

    pub fn id(&self) -> &SpaceId {
        &self.space().id
    }

    pub fn position(&self) -> &Position {
        &self.space().position
    }
}

// ---------------------------------------------------------------------------
// Plants and gardens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub garden_id: GardenId,
    pub planting_date: Option<NaiveDate>,
}

/// A plant annotated with whether some space in its garden holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantPlacement {
    #[serde(flatten)]
    pub plant: Plant,
    pub placed: bool,
    pub space_id: Option<SpaceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garden {
    pub id: GardenId,
    #[serde(default)]
    pub subscription_tier: Tier,
    #[serde(default)]
    pub purchased_extra_spaces: u32,
}

impl Garden {
    pub fn context(&self) -> GridContext {
        GridContext::new(self.subscription_tier, self.purchased_extra_spaces)
    }
}

// ---------------------------------------------------------------------------
// Sync requests
// ---------------------------------------------------------------------------

/// Occupancy written to the store for one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub garden_id: GardenId,
    pub space_id: SpaceId,
    pub position: Position,
    pub plant_id: PlantId,
    pub planting_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// `false` while the space is still a local placeholder; the store then
    /// creates the record and issues its id.
    pub persisted: bool,
}

/// Care metadata written to the store for an occupied space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareRecord {
    pub space_id: SpaceId,
    pub care: CareTimestamps,
    pub image_ref: Option<String>,
    pub care_suggestions: Option<String>,
}

/// A remote write implied by a local mutation. The engine only describes
/// these; the sync layer performs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncRequest {
    Place(PlaceRecord),
    Remove { space_id: SpaceId },
    Care(CareRecord),
}

impl SyncRequest {
    pub fn label(&self) -> &'static str {
        match self {
            SyncRequest::Place(_) => "place",
            SyncRequest::Remove { .. } => "remove",
            SyncRequest::Care(_) => "care",
        }
    }

    pub fn space_id(&self) -> &SpaceId {
        match self {
            SyncRequest::Place(PlaceRecord { space_id, .. })
            | SyncRequest::Remove { space_id }
            | SyncRequest::Care(CareRecord { space_id, .. }) => space_id,
        }
    }
}
