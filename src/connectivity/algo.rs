//! Connectivity algorithm orchestrator
//!
//! Owns the item index and the dirty-net bitset, and exposes the mutator /
//! search / propagation surface consumed by the editor and the rule checks:
//! `add`, `remove`, `build`, `search_clusters`, `propagate_nets`,
//! `find_isolated_copper_islands`, `get_clusters`.
//!
//! The dirty-item search is the only parallel phase. Workers drain a shared
//! atomic cursor over the dirty-item list, so load balances regardless of
//! per-item cost; adjacency writes are confined to the two items under test
//! and each unordered pair is tested by exactly one worker, which keeps the
//! resulting graph identical for any thread count.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::trace;

use crate::board::{Board, EntityId, EntityKind, LayerId, NetCode};
use crate::progress::{BoardCommit, ProgressReporter};

use super::clusters::CnCluster;
use super::items::{CnItemList, ItemId};
use super::visitor::CnVisitor;

/// Cluster search modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterSearchMode {
    /// Cross-net exploration used to (re)assign nets from scratch
    Propagate,
    /// Within-net, all kinds; used for isolated-copper-island detection
    ConnectivityCheck,
    /// Within-net, all kinds; used for unrouted-connection display
    Ratsnest,
}

/// Conflict policy for net propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateMode {
    /// Leave clusters with conflicting nets untouched
    SkipConflicts,
    /// Resolve conflicts by adopting the cluster origin net
    ResolveConflicts,
}

/// Entity kinds eligible for clustering
const ALL_KINDS: &[EntityKind] = &[
    EntityKind::Pad,
    EntityKind::Track,
    EntityKind::Arc,
    EntityKind::Via,
    EntityKind::Zone,
];

/// Propagation never traverses zones; their nets are netlist-assigned
const PROPAGATE_KINDS: &[EntityKind] = &[
    EntityKind::Pad,
    EntityKind::Track,
    EntityKind::Arc,
    EntityKind::Via,
];

/// Growable bitset of nets whose connectivity result may have changed
///
/// Owned by the orchestrator, never global. Negative net codes clamp to a
/// no-op; growth extends with `true` so newly observed nets start dirty.
#[derive(Debug, Default)]
pub struct DirtyNets {
    bits: Vec<bool>,
}

impl DirtyNets {
    pub fn mark(&mut self, net: NetCode) {
        if net < 0 {
            return;
        }

        let index = net as usize;
        if self.bits.len() <= index {
            self.bits.resize(index + 1, true);
        }
        self.bits[index] = true;
    }

    /// Nets never observed report dirty: they still need a first pass
    pub fn is_dirty(&self, net: NetCode) -> bool {
        if net < 0 {
            return false;
        }
        self.bits.get(net as usize).copied().unwrap_or(true)
    }

    pub fn clear_all(&mut self) {
        for bit in &mut self.bits {
            *bit = false;
        }
    }

    /// Net codes currently flagged dirty, ascending
    pub fn dirty_nets(&self) -> Vec<NetCode> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, dirty)| **dirty)
            .map(|(net, _)| net as NetCode)
            .collect()
    }
}

/// Per-zone result record for the batch island search
#[derive(Debug)]
pub struct ZoneIslandList {
    pub zone: EntityId,
    /// Isolated island indices per layer
    pub islands: BTreeMap<LayerId, Vec<usize>>,
}

impl ZoneIslandList {
    pub fn new(zone: EntityId) -> Self {
        Self {
            zone,
            islands: BTreeMap::new(),
        }
    }
}

/// The connectivity analysis cache
#[derive(Default)]
pub struct ConnectivityAlgo {
    item_list: CnItemList,
    /// Entity -> items owned by it; insertion-ordered for deterministic
    /// teardown and iteration
    item_map: IndexMap<EntityId, Vec<ItemId>>,
    dirty_nets: DirtyNets,
    conn_clusters: Vec<CnCluster>,
    ratsnest_clusters: Vec<CnCluster>,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl ConnectivityAlgo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_progress_reporter(&mut self, reporter: Option<Arc<dyn ProgressReporter>>) {
        self.progress = reporter;
    }

    pub fn item_list(&self) -> &CnItemList {
        &self.item_list
    }

    pub fn item_count(&self) -> usize {
        self.item_list.len()
    }

    pub fn mark_net_as_dirty(&mut self, net: NetCode) {
        self.dirty_nets.mark(net);
    }

    pub fn is_net_dirty(&self, net: NetCode) -> bool {
        self.dirty_nets.is_dirty(net)
    }

    pub fn dirty_nets(&self) -> Vec<NetCode> {
        self.dirty_nets.dirty_nets()
    }

    pub fn clear_dirty_nets(&mut self) {
        self.dirty_nets.clear_all();
    }

    fn mark_entity_net_dirty(&mut self, board: &Board, entity: EntityId) {
        if board.kind(entity) == EntityKind::Footprint {
            for &pad in board.footprint_pads(entity) {
                self.dirty_nets.mark(board.net(pad));
            }
        } else {
            self.dirty_nets.mark(board.net(entity));
        }
    }

    /// Registers a board entity for analysis
    ///
    /// Returns false for entities without copper presence, entities already
    /// registered, and pads/footprints still flagged as freshly added by a
    /// pending bulk build.
    pub fn add(&mut self, board: &Board, entity: EntityId) -> bool {
        if !board.is_on_copper(entity) {
            return false;
        }

        match board.kind(entity) {
            EntityKind::Footprint => {
                if board.freshly_added(entity) {
                    return false;
                }

                let pads = board.footprint_pads(entity).to_vec();
                if pads.iter().any(|pad| self.item_map.contains_key(pad)) {
                    return false;
                }

                for pad in pads {
                    let items = self.item_list.add_entity(board, pad);
                    self.item_map.insert(pad, items);
                }
            }
            EntityKind::Pad => {
                if board.freshly_added(entity) {
                    return false;
                }
                if self.item_map.contains_key(&entity) {
                    return false;
                }

                let items = self.item_list.add_entity(board, entity);
                self.item_map.insert(entity, items);
            }
            EntityKind::Track | EntityKind::Arc | EntityKind::Via | EntityKind::Zone => {
                if self.item_map.contains_key(&entity) {
                    return false;
                }

                let items = self.item_list.add_entity(board, entity);
                self.item_map.insert(entity, items);
            }
        }

        self.mark_entity_net_dirty(board, entity);
        true
    }

    /// Marks an entity's items invalid and schedules garbage collection
    ///
    /// Items are purged from the index on the next search pass, never
    /// synchronously. Returns false for entities that were never registered.
    pub fn remove(&mut self, board: &Board, entity: EntityId) -> bool {
        self.mark_entity_net_dirty(board, entity);

        let removed = match board.kind(entity) {
            EntityKind::Footprint => {
                let mut any = false;
                for &pad in board.footprint_pads(entity) {
                    any |= self.invalidate_entity(pad);
                }
                any
            }
            _ => self.invalidate_entity(entity),
        };

        if removed {
            self.item_list.set_dirty(true);
            // Removal may sever connections between any two neighbors
            self.item_list.set_has_invalid(true);
        }

        removed
    }

    fn invalidate_entity(&mut self, entity: EntityId) -> bool {
        match self.item_map.shift_remove(&entity) {
            Some(items) => {
                for id in items {
                    self.item_list.get(id).set_invalid();
                }
                true
            }
            None => false,
        }
    }

    /// Full (re)population from the board, with bounded progress reporting
    pub fn build(&mut self, board: &Board) {
        // Zones are far more expensive to add than single-shape items
        const ZONE_SCALER: usize = 50;

        let mut zones = Vec::new();
        let mut tracks = Vec::new();
        let mut pads = Vec::new();

        for id in board.iter_ids() {
            match board.kind(id) {
                EntityKind::Zone => zones.push(id),
                EntityKind::Track | EntityKind::Arc | EntityKind::Via => tracks.push(id),
                EntityKind::Pad => pads.push(id),
                EntityKind::Footprint => {}
            }
        }

        // Our caller gets the other third of the progress bar
        let size = ((zones.len() * ZONE_SCALER + tracks.len() + pads.len()) * 3 / 2).max(1);
        let delta = (size / 10).max(100);
        let mut ii = 0usize;

        for &zone in &zones {
            self.add(board, zone);
            ii += ZONE_SCALER;

            if let Some(progress) = &self.progress {
                progress.set_current_progress(ii as f64 / size as f64);
                progress.keep_refreshing();
            }
        }

        for &track in &tracks {
            self.add(board, track);
            ii += 1;

            if ii % delta == 0 {
                if let Some(progress) = &self.progress {
                    progress.set_current_progress(ii as f64 / size as f64);
                    progress.keep_refreshing();
                }
            }
        }

        for &pad in &pads {
            self.add(board, pad);
            ii += 1;

            if ii % delta == 0 {
                if let Some(progress) = &self.progress {
                    progress.set_current_progress(ii as f64 / size as f64);
                    progress.keep_refreshing();
                }
            }
        }

        if let Some(progress) = &self.progress {
            progress.set_current_progress(ii as f64 / size as f64);
            progress.keep_refreshing();
        }
    }

    /// Incremental bulk add
    pub fn build_items(&mut self, board: &Board, items: &[EntityId]) {
        for &entity in items {
            match board.kind(entity) {
                EntityKind::Track
                | EntityKind::Arc
                | EntityKind::Via
                | EntityKind::Pad => {
                    self.add(board, entity);
                }
                EntityKind::Footprint => {
                    for &pad in board.footprint_pads(entity) {
                        self.add(board, pad);
                    }
                }
                EntityKind::Zone => {}
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.progress
            .as_ref()
            .map(|p| p.is_cancelled())
            .unwrap_or(false)
    }

    /// Recomputes adjacency for all dirty items
    ///
    /// Garbage-collects invalidated items first, then dispatches the
    /// collision visitor over the dirty set: inline for small sets, else
    /// across a bounded worker pool sharing one atomic cursor. The calling
    /// thread polls completion in 100 ms slices so the progress pump stays
    /// serviced.
    fn search_connections(&mut self, board: &Board) {
        let mut garbage: Vec<ItemId> = Vec::with_capacity(1024);
        self.item_list.remove_invalid_items(&mut garbage);

        if !garbage.is_empty() {
            trace!(count = garbage.len(), "garbage collected invalid items");
        }

        let dirty_items = self.item_list.dirty_items();

        if let Some(progress) = &self.progress {
            progress.set_max_progress(dirty_items.len());
            if !progress.keep_refreshing() {
                return;
            }
        }

        if self.item_list.is_dirty() {
            let workers = thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(dirty_items.len().div_ceil(8));

            let cursor = AtomicUsize::new(0);
            let list = &self.item_list;
            let progress = self.progress.as_deref();

            let worker = || {
                loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    if i >= dirty_items.len() {
                        break;
                    }

                    let item = list.get(dirty_items[i]);
                    CnVisitor::new(item, list, board).run();

                    if let Some(p) = progress {
                        if p.is_cancelled() {
                            break;
                        }
                        p.advance_progress();
                    }
                }
            };

            if workers <= 1 {
                worker();
            } else {
                trace!(workers, dirty = dirty_items.len(), "parallel connection search");

                let done = AtomicUsize::new(0);
                thread::scope(|scope| {
                    for _ in 0..workers {
                        scope.spawn(|| {
                            worker();
                            done.fetch_add(1, Ordering::Release);
                        });
                    }

                    if let Some(p) = progress {
                        while done.load(Ordering::Acquire) < workers {
                            p.keep_refreshing();
                            thread::sleep(Duration::from_millis(100));
                        }
                    }
                });
            }

            if let Some(p) = progress {
                p.keep_refreshing();
            }
        }

        // A cancelled pass leaves dirty flags set so the next one redoes it
        if !self.is_cancelled() {
            self.item_list.clear_dirty_flags();
        }
    }

    /// Cluster search with the mode's default kind set
    pub fn search_clusters(&mut self, board: &Board, mode: ClusterSearchMode) -> Vec<CnCluster> {
        let kinds = match mode {
            ClusterSearchMode::Propagate => PROPAGATE_KINDS,
            _ => ALL_KINDS,
        };
        self.search_clusters_filtered(board, mode, kinds, -1)
    }

    /// Cluster search over valid items of the given kinds
    ///
    /// A non-negative `net_filter` restricts the working set to one net.
    /// Items without a positive net are excluded unless the mode is
    /// `Propagate`, which must reach not-yet-assigned items so new
    /// connections can receive a net. Returns clusters sorted ascending by
    /// origin net; a cancelled search returns an empty list, never a
    /// partial one.
    pub fn search_clusters_filtered(
        &mut self,
        board: &Board,
        mode: ClusterSearchMode,
        kinds: &[EntityKind],
        net_filter: NetCode,
    ) -> Vec<CnCluster> {
        let within_any_net = mode != ClusterSearchMode::Propagate;

        if self.item_list.is_dirty() {
            self.search_connections(board);
        }

        let mut item_set: BTreeSet<ItemId> = BTreeSet::new();

        for item in self.item_list.iter() {
            if !item.valid() {
                continue;
            }
            if within_any_net && item.net() <= 0 {
                continue;
            }
            if net_filter >= 0 && item.net() != net_filter {
                continue;
            }
            if !kinds.contains(&board.kind(item.parent())) {
                continue;
            }

            item.set_visited(false);
            item_set.insert(item.id());
        }

        if self.is_cancelled() {
            return Vec::new();
        }

        let mut clusters = Vec::new();
        let mut queue: VecDeque<ItemId> = VecDeque::new();

        for &seed in &item_set {
            let root = self.item_list.get(seed);
            if root.visited() {
                continue;
            }
            root.set_visited(true);

            let mut cluster = CnCluster::new();
            queue.clear();
            queue.push_back(seed);

            while let Some(current) = queue.pop_front() {
                let current_item = self.item_list.get(current);
                cluster.add(current_item);

                for neighbor in current_item.connected_items() {
                    if !item_set.contains(&neighbor) {
                        continue;
                    }

                    let neighbor_item = self.item_list.get(neighbor);

                    // Stale edge to a removed item, or a foreign net in a
                    // within-net search
                    if !neighbor_item.valid() {
                        continue;
                    }
                    if within_any_net && neighbor_item.net() != root.net() {
                        continue;
                    }

                    if !neighbor_item.visited() {
                        neighbor_item.set_visited(true);
                        queue.push_back(neighbor);
                    }
                }
            }

            clusters.push(cluster);
        }

        if self.is_cancelled() {
            return Vec::new();
        }

        clusters.sort_by_key(|c| c.origin_net());
        clusters
    }

    /// Ratsnest consumer surface: clusters sorted by origin net
    pub fn get_clusters(&mut self, board: &Board) -> &[CnCluster] {
        self.ratsnest_clusters = self.search_clusters(board, ClusterSearchMode::Ratsnest);
        &self.ratsnest_clusters
    }

    /// Assigns cluster origin nets to members that may change net
    ///
    /// This is the mechanism by which a track moved onto a pad inherits the
    /// pad's net. The commit sink is notified before every mutation.
    pub fn propagate_nets(
        &mut self,
        board: &mut Board,
        commit: Option<&mut dyn BoardCommit>,
        mode: PropagateMode,
    ) {
        self.conn_clusters = self.search_clusters(board, ClusterSearchMode::Propagate);
        self.propagate_connections(board, commit, mode);
    }

    fn propagate_connections(
        &mut self,
        board: &mut Board,
        mut commit: Option<&mut dyn BoardCommit>,
        mode: PropagateMode,
    ) {
        let skip_conflicts = mode == PropagateMode::SkipConflicts;
        trace!(skip_conflicts, "propagating cluster nets");

        let clusters = std::mem::take(&mut self.conn_clusters);

        for cluster in &clusters {
            if skip_conflicts && cluster.is_conflicting() {
                trace!(
                    net = cluster.origin_net(),
                    "conflicting nets in cluster; skipping update"
                );
                continue;
            }

            if cluster.is_orphaned() {
                trace!("skipping orphaned cluster");
                continue;
            }

            if !cluster.has_valid_net() {
                trace!("cluster connected to unused net");
                continue;
            }

            if cluster.is_conflicting() {
                trace!(
                    net = cluster.origin_net(),
                    "conflicting nets in cluster; chose lowest"
                );
            }

            let origin = cluster.origin_net();
            let mut changed = 0;

            for &item_id in cluster.items() {
                let item = self.item_list.get(item_id);

                if !item.valid() {
                    continue;
                }
                if !board.can_change_net(item.parent()) {
                    continue;
                }
                if board.net(item.parent()) == origin {
                    continue;
                }

                self.dirty_nets.mark(board.net(item.parent()));
                self.dirty_nets.mark(origin);

                if let Some(commit) = commit.as_deref_mut() {
                    commit.modify(item.parent());
                }

                board.set_net(item.parent(), origin);
                item.set_net(origin);
                changed += 1;
            }

            if changed > 0 {
                trace!(net = origin, changed, "cluster net propagated");
            }
        }

        self.conn_clusters = clusters;
    }

    /// Isolated islands of one zone on one layer
    ///
    /// Re-adds the zone to force fresh per-island items, then reports the
    /// island indices of orphaned clusters containing the zone.
    pub fn find_isolated_copper_islands(
        &mut self,
        board: &Board,
        zone: EntityId,
        layer: LayerId,
    ) -> Vec<usize> {
        if board.zone_islands(zone, layer).is_empty() {
            return Vec::new();
        }

        self.remove(board, zone);
        self.add(board, zone);

        self.conn_clusters = self.search_clusters(board, ClusterSearchMode::ConnectivityCheck);

        let mut islands = Vec::new();

        for cluster in &self.conn_clusters {
            if cluster.is_orphaned() && cluster.contains_entity(&self.item_list, zone) {
                for &id in cluster.items() {
                    let item = self.item_list.get(id);
                    if item.parent() == zone && item.layer() == layer {
                        if let Some(island) = item.island_index() {
                            islands.push(island);
                        }
                    }
                }
            }
        }

        trace!(count = islands.len(), "found isolated islands");
        islands
    }

    /// Batch island search across many zones: one cluster pass, all layers
    pub fn find_isolated_copper_islands_batch(
        &mut self,
        board: &Board,
        zones: &mut [ZoneIslandList],
    ) {
        const DELTA: usize = 10;

        for (ii, entry) in zones.iter().enumerate() {
            self.remove(board, entry.zone);
            self.add(board, entry.zone);

            if let Some(progress) = &self.progress {
                if (ii + 1) % DELTA == 0 {
                    progress.set_current_progress((ii + 1) as f64 / zones.len() as f64);
                    progress.keep_refreshing();
                }

                if progress.is_cancelled() {
                    return;
                }
            }
        }

        self.conn_clusters = self.search_clusters(board, ClusterSearchMode::ConnectivityCheck);

        for entry in zones.iter_mut() {
            for layer in board.layers(entry.zone).copper().iter() {
                if board.zone_islands(entry.zone, layer).is_empty() {
                    continue;
                }

                for cluster in &self.conn_clusters {
                    if cluster.is_orphaned()
                        && cluster.contains_entity(&self.item_list, entry.zone)
                    {
                        for &id in cluster.items() {
                            let item = self.item_list.get(id);
                            if item.parent() == entry.zone && item.layer() == layer {
                                if let Some(island) = item.island_index() {
                                    entry.islands.entry(layer).or_default().push(island);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Drops the whole analysis cache; the dirty-net bitset survives so
    /// consumers still see pending recomputation
    pub fn clear(&mut self) {
        self.item_list.clear();
        self.item_map.clear();
        self.conn_clusters.clear();
        self.ratsnest_clusters.clear();
    }
}
