//! Connectable items and the spatial item index
//!
//! A `CnItem` wraps one net-bearing board entity (or one filled zone island
//! on one layer) as a node in the connectivity graph. `CnItemList` owns the
//! items in an arena and keeps a per-copper-layer R-tree over their bounding
//! boxes for proximity queries.
//!
//! Items are never erased in place: removal marks them invalid and a
//! garbage-collection pass at the start of the next search drops their index
//! entries and heavy payloads. Adjacency edges pointing at an invalidated
//! item stay in place and are filtered through the validity flag at
//! traversal time. Arena slots are never reused, so an `ItemId` doubles as a
//! stable, monotonic creation sequence number.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

use rstar::{RTree, RTreeObject, AABB};

use crate::board::{Board, EntityId, EntityKind, LayerId, LayerSet, NetCode};
use crate::geometry::{point_in_polygon, BoundingBox, Point};

/// Index of an item in the arena; also its creation sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub usize);

/// Closed set of connectable item kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Pad,
    Track,
    Arc,
    Via,
    /// One filled island of a zone on one layer
    ZoneIsland { island: usize },
}

/// One node of the connectivity graph
#[derive(Debug)]
pub struct CnItem {
    id: ItemId,
    parent: EntityId,
    kind: ItemKind,
    /// Island layer for zone islands, first occupied copper layer otherwise
    layer: LayerId,
    layers: LayerSet,
    /// Cached copy of the owner's net; refreshed by propagation
    net: AtomicI32,
    bbox: BoundingBox,
    /// Filled outline, zone islands only
    outline: Vec<Point>,
    valid: AtomicBool,
    dirty: AtomicBool,
    /// Transient, meaningful only within one cluster traversal
    visited: AtomicBool,
    /// Two workers may connect distinct reference items to the same third
    /// item concurrently, so the adjacency set is internally synchronized
    connected: Mutex<Vec<ItemId>>,
}

impl CnItem {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: ItemId,
        parent: EntityId,
        kind: ItemKind,
        layer: LayerId,
        layers: LayerSet,
        net: NetCode,
        bbox: BoundingBox,
        outline: Vec<Point>,
    ) -> Self {
        Self {
            id,
            parent,
            kind,
            layer,
            layers,
            net: AtomicI32::new(net),
            bbox,
            outline,
            valid: AtomicBool::new(true),
            dirty: AtomicBool::new(true),
            visited: AtomicBool::new(false),
            connected: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn parent(&self) -> EntityId {
        self.parent
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn layers(&self) -> LayerSet {
        self.layers
    }

    pub fn net(&self) -> NetCode {
        self.net.load(Ordering::Relaxed)
    }

    pub(crate) fn set_net(&self, net: NetCode) {
        self.net.store(net, Ordering::Relaxed);
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn valid(&self) -> bool {
        self.valid.load(Ordering::Relaxed)
    }

    pub(crate) fn set_invalid(&self) {
        self.valid.store(false, Ordering::Relaxed);
    }

    pub fn dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub(crate) fn set_dirty(&self, value: bool) {
        self.dirty.store(value, Ordering::Relaxed);
    }

    pub fn visited(&self) -> bool {
        self.visited.load(Ordering::Relaxed)
    }

    pub fn set_visited(&self, value: bool) {
        self.visited.store(value, Ordering::Relaxed);
    }

    /// Records a proven connection; idempotent, no geometry check
    pub fn connect(&self, other: ItemId) {
        let mut connected = self.connected.lock().expect("adjacency lock poisoned");
        if !connected.contains(&other) {
            connected.push(other);
        }
    }

    /// Snapshot of the adjacency set
    pub fn connected_items(&self) -> Vec<ItemId> {
        self.connected.lock().expect("adjacency lock poisoned").clone()
    }

    pub fn is_zone_island(&self) -> bool {
        matches!(self.kind, ItemKind::ZoneIsland { .. })
    }

    pub fn island_index(&self) -> Option<usize> {
        match self.kind {
            ItemKind::ZoneIsland { island } => Some(island),
            _ => None,
        }
    }

    pub fn outline(&self) -> &[Point] {
        &self.outline
    }

    /// Point containment in the island fill, zone islands only
    pub fn contains_point(&self, p: Point) -> bool {
        point_in_polygon(p, &self.outline)
    }

    /// Frees the heavy payload of an invalidated item
    fn release_payload(&mut self) {
        self.outline = Vec::new();
        *self.connected.get_mut().expect("adjacency lock poisoned") = Vec::new();
    }
}

/// R-tree entry: item id plus cached envelope
#[derive(Debug, Clone)]
struct IndexEntry {
    id: ItemId,
    envelope: AABB<[f32; 2]>,
}

impl IndexEntry {
    fn new(id: ItemId, bbox: &BoundingBox) -> Self {
        Self {
            id,
            envelope: AABB::from_corners(bbox.min, bbox.max),
        }
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Arena of connectable items with per-layer spatial buckets
#[derive(Debug, Default)]
pub struct CnItemList {
    items: Vec<CnItem>,
    buckets: HashMap<LayerId, RTree<IndexEntry>>,
    dirty: bool,
    has_invalid: bool,
}

impl CnItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> &CnItem {
        debug_assert!(id.0 < self.items.len(), "item id out of range");
        &self.items[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CnItem> {
        self.items.iter()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, value: bool) {
        self.dirty = value;
    }

    pub fn has_invalid(&self) -> bool {
        self.has_invalid
    }

    pub fn set_has_invalid(&mut self, value: bool) {
        self.has_invalid = value;
    }

    /// Ids of all items awaiting re-search
    pub fn dirty_items(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.dirty())
            .map(|item| item.id())
            .collect()
    }

    fn insert_item(
        &mut self,
        parent: EntityId,
        kind: ItemKind,
        layer: LayerId,
        layers: LayerSet,
        net: NetCode,
        bbox: BoundingBox,
        outline: Vec<Point>,
    ) -> ItemId {
        let id = ItemId(self.items.len());
        self.items
            .push(CnItem::new(id, parent, kind, layer, layers, net, bbox, outline));

        for bucket_layer in layers.copper().iter() {
            self.buckets
                .entry(bucket_layer)
                .or_insert_with(RTree::new)
                .insert(IndexEntry::new(id, &bbox));
        }

        self.dirty = true;
        id
    }

    /// Inserts the item(s) representing one board entity
    ///
    /// Pads, tracks, arcs and vias map to one item each; zones map to one
    /// item per filled island per copper layer. Returns the created ids
    /// (empty for an unfilled zone).
    pub fn add_entity(&mut self, board: &Board, entity: EntityId) -> Vec<ItemId> {
        let mut created = Vec::new();
        let net = board.net(entity);

        match board.kind(entity) {
            EntityKind::Zone => {
                for layer in board.layers(entity).copper().iter() {
                    for (island, outline) in board.zone_islands(entity, layer).iter().enumerate() {
                        let bbox = BoundingBox::from_points(outline);
                        created.push(self.insert_item(
                            entity,
                            ItemKind::ZoneIsland { island },
                            layer,
                            LayerSet::single(layer),
                            net,
                            bbox,
                            outline.clone(),
                        ));
                    }
                }
            }
            kind => {
                let item_kind = match kind {
                    EntityKind::Pad => ItemKind::Pad,
                    EntityKind::Track => ItemKind::Track,
                    EntityKind::Arc => ItemKind::Arc,
                    EntityKind::Via => ItemKind::Via,
                    // Footprints are decomposed into pads by the caller
                    EntityKind::Footprint | EntityKind::Zone => return created,
                };

                let layers = board.layers(entity).copper();
                let Some(first_layer) = layers.first() else {
                    return created;
                };

                let mut bbox: Option<BoundingBox> = None;
                for layer in layers.iter() {
                    for shape in board.effective_shapes(entity, layer) {
                        let shape_bbox = shape.bbox();
                        bbox = Some(match bbox {
                            Some(b) => b.merge(&shape_bbox),
                            None => shape_bbox,
                        });
                    }
                }

                if let Some(bbox) = bbox {
                    created.push(self.insert_item(
                        entity,
                        item_kind,
                        first_layer,
                        layers,
                        net,
                        bbox,
                        Vec::new(),
                    ));
                }
            }
        }

        created
    }

    /// Invokes `visit` once per valid candidate whose bounding box overlaps
    /// the reference item's, on any layer the reference occupies
    pub fn find_nearby<F: FnMut(&CnItem)>(&self, reference: &CnItem, mut visit: F) {
        let envelope = AABB::from_corners(reference.bbox().min, reference.bbox().max);
        let mut seen: HashSet<ItemId> = HashSet::new();
        seen.insert(reference.id());

        for layer in reference.layers().copper().iter() {
            let Some(tree) = self.buckets.get(&layer) else {
                continue;
            };

            for entry in tree.locate_in_envelope_intersecting(&envelope) {
                if seen.insert(entry.id) {
                    visit(self.get(entry.id));
                }
            }
        }
    }

    /// Garbage collection: drops index entries and payloads of invalid
    /// items, pushing their ids into `garbage`. Single O(n) pass; arena
    /// slots are tombstoned, never compacted — stale adjacency edges keep
    /// referring to collected ids, so a collected id must never come to
    /// denote a different item. A tombstone shrinks to a few words once
    /// its payload is released; reclaiming the slots themselves takes a
    /// `clear()` and rebuild.
    pub fn remove_invalid_items(&mut self, garbage: &mut Vec<ItemId>) {
        if !self.has_invalid {
            return;
        }

        for item in &self.items {
            if !item.valid() {
                garbage.push(item.id());
            }
        }

        if !garbage.is_empty() {
            // Rebuild each bucket over the surviving items
            let mut by_layer: HashMap<LayerId, Vec<IndexEntry>> = HashMap::new();

            for item in self.items.iter().filter(|i| i.valid()) {
                for layer in item.layers().copper().iter() {
                    by_layer
                        .entry(layer)
                        .or_default()
                        .push(IndexEntry::new(item.id(), item.bbox()));
                }
            }

            self.buckets = by_layer
                .into_iter()
                .map(|(layer, entries)| (layer, RTree::bulk_load(entries)))
                .collect();

            for id in garbage.iter() {
                self.items[id.0].release_payload();
            }
        }

        self.has_invalid = false;
    }

    /// Clears every item's dirty flag along with the coarse list flag
    pub fn clear_dirty_flags(&mut self) {
        for item in &self.items {
            item.set_dirty(false);
        }
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.buckets.clear();
        self.dirty = false;
        self.has_invalid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;

    fn circle_pad_board() -> (Board, EntityId, EntityId) {
        let mut board = Board::new();
        let a = board.add_pad(
            Shape::Circle {
                center: Point::new(0.0, 0.0),
                radius: 0.5,
            },
            LayerSet::single(LayerId::F_CU),
            1,
        );
        let b = board.add_pad(
            Shape::Circle {
                center: Point::new(0.6, 0.0),
                radius: 0.5,
            },
            LayerSet::single(LayerId::F_CU),
            1,
        );
        (board, a, b)
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (board, a, b) = circle_pad_board();
        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, a)[0];
        let ib = list.add_entity(&board, b)[0];

        list.get(ia).connect(ib);
        list.get(ia).connect(ib);

        assert_eq!(list.get(ia).connected_items(), vec![ib]);
    }

    #[test]
    fn test_find_nearby_skips_reference() {
        let (board, a, b) = circle_pad_board();
        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, a)[0];
        let ib = list.add_entity(&board, b)[0];

        let mut visited = Vec::new();
        list.find_nearby(list.get(ia), |item| visited.push(item.id()));

        assert_eq!(visited, vec![ib]);
    }

    #[test]
    fn test_find_nearby_respects_layers() {
        let mut board = Board::new();
        let a = board.add_pad(
            Shape::Circle {
                center: Point::new(0.0, 0.0),
                radius: 0.5,
            },
            LayerSet::single(LayerId::F_CU),
            1,
        );
        // Overlapping in XY but on the other side of the board
        let b = board.add_pad(
            Shape::Circle {
                center: Point::new(0.1, 0.0),
                radius: 0.5,
            },
            LayerSet::single(LayerId::B_CU),
            1,
        );

        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, a)[0];
        list.add_entity(&board, b);

        let mut visited = Vec::new();
        list.find_nearby(list.get(ia), |item| visited.push(item.id()));

        assert!(visited.is_empty());
    }

    #[test]
    fn test_remove_invalid_items_collects_garbage() {
        let (board, a, b) = circle_pad_board();
        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, a)[0];
        let ib = list.add_entity(&board, b)[0];

        list.get(ia).set_invalid();
        list.set_has_invalid(true);

        let mut garbage = Vec::new();
        list.remove_invalid_items(&mut garbage);

        assert_eq!(garbage, vec![ia]);
        assert!(!list.has_invalid());

        // The invalidated item no longer shows up in proximity queries
        let mut visited = Vec::new();
        list.find_nearby(list.get(ib), |item| visited.push(item.id()));
        assert!(visited.is_empty());
    }

    #[test]
    fn test_zone_with_empty_outline_is_tolerated() {
        let mut board = Board::new();
        let mut fills = std::collections::BTreeMap::new();
        // A degenerate fill result: the island has no vertices
        fills.insert(LayerId::F_CU, vec![Vec::new()]);
        let zone = board.add_zone(fills, 2);

        let mut list = CnItemList::new();
        let created = list.add_entity(&board, zone);

        assert_eq!(created.len(), 1);
        assert!(list.get(created[0]).outline().is_empty());
    }

    #[test]
    fn test_zone_creates_one_item_per_island_per_layer() {
        let mut board = Board::new();
        let island_a = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let island_b: Vec<Point> = island_a
            .iter()
            .map(|p| Point::new(p.x + 5.0, p.y))
            .collect();

        let mut fills = std::collections::BTreeMap::new();
        fills.insert(LayerId::F_CU, vec![island_a.clone(), island_b]);
        fills.insert(LayerId::B_CU, vec![island_a]);
        let zone = board.add_zone(fills, 2);

        let mut list = CnItemList::new();
        let created = list.add_entity(&board, zone);

        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|id| list.get(*id).is_zone_island()));
    }
}
