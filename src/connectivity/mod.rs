//! Connectivity analysis core
//!
//! Determines which physical shapes on the board are electrically connected,
//! propagates net identity across connected groups, and supports incremental
//! re-analysis as the board is edited.
//!
//! # Submodules
//! - `items` - Connectable items and the per-layer spatial item index
//! - `visitor` - Collision visitor establishing adjacency edges
//! - `clusters` - Connected-component view over valid items
//! - `algo` - Orchestrator: mutators, search, clustering, net propagation

mod algo;
mod clusters;
mod items;
mod visitor;

pub use items::{CnItem, CnItemList, ItemId, ItemKind};

pub use clusters::CnCluster;

pub use visitor::CnVisitor;

pub use algo::{
    ClusterSearchMode, ConnectivityAlgo, DirtyNets, PropagateMode, ZoneIslandList,
};
