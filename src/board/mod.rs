//! Board data model consumed by the connectivity core
//!
//! # Submodules
//! - `layers` - Layer identity and layer bitsets
//! - `model` - Entity arena (pads, tracks, arcs, vias, zones, footprints)

mod layers;
mod model;

pub use layers::{LayerId, LayerSet, MAX_COPPER_LAYERS};

pub use model::{
    ArcTrack, Board, BoardEntity, EntityId, EntityKind, Footprint, NetCode, Pad, Track, Via,
    Zone, NET_NONE,
};
