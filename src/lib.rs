//! Connectivity analysis core for a PCB design tool
//!
//! Determines, from raw board geometry (copper traces, vias, pads, filled
//! zones), which physical shapes are electrically connected, assigns and
//! propagates net identity across connected groups, and supports incremental
//! re-analysis while the board is being edited.
//!
//! Proximity search runs over per-layer R-tree indexes so collision search
//! stays sub-quadratic on boards with tens of thousands of primitives; the
//! dirty-item search phase is parallelized across a bounded worker pool with
//! a deterministic result regardless of thread count.
//!
//! # Modules
//! - `geometry` - Points, shapes, and collision primitives
//! - `board` - Board entity arena consumed through a narrow surface
//! - `connectivity` - Items, spatial index, visitor, clusters, orchestrator
//! - `drc` - Rule checks consuming the connectivity data
//! - `progress` - Progress-reporting and commit/undo collaborator traits

pub mod board;
pub mod connectivity;
pub mod drc;
pub mod geometry;
pub mod progress;

pub use board::{Board, EntityId, EntityKind, LayerId, LayerSet, NetCode, NET_NONE};

pub use connectivity::{
    ClusterSearchMode, CnCluster, CnItem, CnItemList, ConnectivityAlgo, ItemId, ItemKind,
    PropagateMode, ZoneIslandList,
};

pub use progress::{BoardCommit, NullCommit, NullProgressReporter, ProgressReporter};
