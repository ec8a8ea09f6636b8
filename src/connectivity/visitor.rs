//! Collision visitor
//!
//! Invoked once per (reference, candidate) pair found spatially close by the
//! item index. Proves or rejects a physical collision and records the
//! adjacency edge in both directions. Dispatch is exhaustive over the closed
//! item kind set: zone-zone pairs use outline containment, zone-item pairs
//! test the item's shape against the island fill, and everything else tests
//! effective shapes on the layers both parents share.

use crate::board::Board;
use crate::geometry::{shape_polygon_collides, shapes_collide};

use super::items::{CnItem, CnItemList};

pub struct CnVisitor<'a> {
    reference: &'a CnItem,
    list: &'a CnItemList,
    board: &'a Board,
}

impl<'a> CnVisitor<'a> {
    pub fn new(reference: &'a CnItem, list: &'a CnItemList, board: &'a Board) -> Self {
        Self {
            reference,
            list,
            board,
        }
    }

    pub fn visit(&self, candidate: &CnItem) {
        if !candidate.valid() || !self.reference.valid() {
            return;
        }

        // Self-pairs prove nothing
        if candidate.parent() == self.reference.parent() {
            return;
        }

        // When both endpoints are dirty the reciprocal visit would repeat
        // identical work; the lower-id candidate performs the test
        if candidate.dirty() && candidate.id() > self.reference.id() {
            return;
        }

        match (self.reference.is_zone_island(), candidate.is_zone_island()) {
            (true, true) => self.check_zone_zone(self.reference, candidate),
            (true, false) => self.check_zone_item(self.reference, candidate),
            (false, true) => self.check_zone_item(candidate, self.reference),
            (false, false) => self.check_item_item(self.reference, candidate),
        }
    }

    /// Zone island vs pad/track/arc/via
    fn check_zone_item(&self, zone_item: &CnItem, item: &CnItem) {
        // A fixed-net item on a foreign net can never join this zone
        if zone_item.net() != item.net() && !self.board.can_change_net(item.parent()) {
            return;
        }

        let layer = zone_item.layer();

        if !item.layers().contains(layer) {
            return;
        }

        if !zone_item.bbox().intersects(item.bbox()) {
            return;
        }

        for shape in self.board.effective_shapes(item.parent(), layer) {
            if shape_polygon_collides(&shape, zone_item.outline()) {
                zone_item.connect(item.id());
                item.connect(zone_item.id());
                return;
            }
        }
    }

    /// Zone island vs zone island: outline-vertex containment both ways
    fn check_zone_zone(&self, a: &CnItem, b: &CnItem) {
        // Only islands of the same net stitch together
        if a.net() != b.net() {
            return;
        }

        if a.layer() != b.layer() {
            return;
        }

        if !a.bbox().intersects(b.bbox()) {
            return;
        }

        for p in a.outline() {
            if b.bbox().contains_point(p) && b.contains_point(*p) {
                a.connect(b.id());
                b.connect(a.id());
                return;
            }
        }

        for p in b.outline() {
            if a.bbox().contains_point(p) && a.contains_point(*p) {
                a.connect(b.id());
                b.connect(a.id());
                return;
            }
        }
    }

    /// Non-zone pair: test effective shapes on every shared copper layer,
    /// stop at the first colliding one
    fn check_item_item(&self, a: &CnItem, b: &CnItem) {
        let common = a.layers().intersection(b.layers()).copper();

        for layer in common.iter() {
            let shapes_a = self.board.effective_shapes(a.parent(), layer);
            let shapes_b = self.board.effective_shapes(b.parent(), layer);

            for sa in &shapes_a {
                for sb in &shapes_b {
                    if shapes_collide(sa, sb) {
                        a.connect(b.id());
                        b.connect(a.id());
                        return;
                    }
                }
            }
        }
    }

    /// Drives one full proximity pass for the reference item
    pub fn run(&self) {
        self.list
            .find_nearby(self.reference, |candidate| self.visit(candidate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{LayerId, LayerSet};
    use crate::geometry::{Point, Shape};

    #[test]
    fn test_overlapping_pads_connect_symmetrically() {
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
                center: Point::new(0.8, 0.0),
                radius: 0.5,
            },
            LayerSet::single(LayerId::F_CU),
            1,
        );

        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, a)[0];
        let ib = list.add_entity(&board, b)[0];

        // The lower-id reference performs the test for a dirty pair
        CnVisitor::new(list.get(ia), &list, &board).run();
        CnVisitor::new(list.get(ib), &list, &board).run();

        assert_eq!(list.get(ia).connected_items(), vec![ib]);
        assert_eq!(list.get(ib).connected_items(), vec![ia]);
    }

    #[test]
    fn test_different_layers_do_not_connect() {
        let mut board = Board::new();
        let a = board.add_track(
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            0.3,
            LayerId::F_CU,
            1,
        );
        let b = board.add_track(
            Point::new(1.0, 0.0),
            Point::new(3.0, 0.0),
            0.3,
            LayerId::B_CU,
            1,
        );

        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, a)[0];
        let ib = list.add_entity(&board, b)[0];

        CnVisitor::new(list.get(ia), &list, &board).run();
        CnVisitor::new(list.get(ib), &list, &board).run();

        assert!(list.get(ia).connected_items().is_empty());
        assert!(list.get(ib).connected_items().is_empty());
    }

    #[test]
    fn test_via_bridges_layers() {
        let mut board = Board::new();
        let front = board.add_track(
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            0.3,
            LayerId::F_CU,
            1,
        );
        let back = board.add_track(
            Point::new(2.0, 0.0),
            Point::new(4.0, 0.0),
            0.3,
            LayerId::B_CU,
            1,
        );
        let via = board.add_via(
            Point::new(2.0, 0.0),
            0.6,
            0.3,
            LayerSet::all_copper(),
            1,
        );

        let mut list = CnItemList::new();
        let it_front = list.add_entity(&board, front)[0];
        let it_back = list.add_entity(&board, back)[0];
        let it_via = list.add_entity(&board, via)[0];

        for id in [it_front, it_back, it_via] {
            CnVisitor::new(list.get(id), &list, &board).run();
        }

        let via_neighbors = list.get(it_via).connected_items();
        assert!(via_neighbors.contains(&it_front));
        assert!(via_neighbors.contains(&it_back));
        assert!(!list.get(it_front).connected_items().contains(&it_back));
    }

    #[test]
    fn test_zone_island_connects_track_inside() {
        let mut board = Board::new();
        let island = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let mut fills = std::collections::BTreeMap::new();
        fills.insert(LayerId::F_CU, vec![island]);
        let zone = board.add_zone(fills, 4);

        let inside = board.add_track(
            Point::new(2.0, 2.0),
            Point::new(8.0, 2.0),
            0.3,
            LayerId::F_CU,
            0,
        );
        let outside = board.add_track(
            Point::new(20.0, 2.0),
            Point::new(25.0, 2.0),
            0.3,
            LayerId::F_CU,
            0,
        );

        let mut list = CnItemList::new();
        let it_zone = list.add_entity(&board, zone)[0];
        let it_inside = list.add_entity(&board, inside)[0];
        let it_outside = list.add_entity(&board, outside)[0];

        for id in [it_zone, it_inside, it_outside] {
            CnVisitor::new(list.get(id), &list, &board).run();
        }

        assert!(list.get(it_zone).connected_items().contains(&it_inside));
        assert!(list.get(it_inside).connected_items().contains(&it_zone));
        assert!(!list.get(it_zone).connected_items().contains(&it_outside));
    }

    #[test]
    fn test_zone_zone_same_net_stitching() {
        let mut board = Board::new();
        let big = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        // Overlaps the corner of `big`
        let small = vec![
            Point::new(8.0, 8.0),
            Point::new(14.0, 8.0),
            Point::new(14.0, 14.0),
            Point::new(8.0, 14.0),
        ];

        let mut fills_a = std::collections::BTreeMap::new();
        fills_a.insert(LayerId::F_CU, vec![big]);
        let zone_a = board.add_zone(fills_a, 7);

        let mut fills_b = std::collections::BTreeMap::new();
        fills_b.insert(LayerId::F_CU, vec![small]);
        let zone_b = board.add_zone(fills_b, 7);

        let mut fills_c = std::collections::BTreeMap::new();
        fills_c.insert(
            LayerId::F_CU,
            vec![vec![
                Point::new(9.0, 9.0),
                Point::new(12.0, 9.0),
                Point::new(12.0, 12.0),
                Point::new(9.0, 12.0),
            ]],
        );
        // Same overlap, different net: must not stitch
        let zone_c = board.add_zone(fills_c, 8);

        let mut list = CnItemList::new();
        let ia = list.add_entity(&board, zone_a)[0];
        let ib = list.add_entity(&board, zone_b)[0];
        let ic = list.add_entity(&board, zone_c)[0];

        for id in [ia, ib, ic] {
            CnVisitor::new(list.get(id), &list, &board).run();
        }

        assert!(list.get(ia).connected_items().contains(&ib));
        assert!(list.get(ib).connected_items().contains(&ia));
        assert!(!list.get(ia).connected_items().contains(&ic));
        assert!(!list.get(ib).connected_items().contains(&ic));
    }
}
